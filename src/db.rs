//! Sets up the application's database schema.

use rusqlite::{Connection, Row, Transaction, TransactionBehavior};

use crate::{Error, ledger_entry::create_ledger_entry_table, wallet::create_wallet_table};

/// Enable foreign keys and create the wallet and ledger tables if they do not exist.
///
/// # Errors
/// Returns an error if there is an SQL error. No tables are created in that case.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    connection.pragma_update(None, "foreign_keys", true)?;

    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_wallet_table(&transaction)?;
    create_ledger_entry_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}

/// Read a `COUNT(..)` result from the first column of `row`.
pub fn read_count(row: &Row) -> Result<u64, rusqlite::Error> {
    let count: i64 = row.get(0)?;

    u64::try_from(count).map_err(|_| rusqlite::Error::IntegralValueOutOfRange(0, count))
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;

    use crate::db::{initialize, read_count};

    #[test]
    fn initialize_is_repeatable() {
        let connection = Connection::open_in_memory().unwrap();

        assert_eq!(initialize(&connection), Ok(()));
        assert_eq!(initialize(&connection), Ok(()));
    }

    #[test]
    fn enables_foreign_keys() {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();

        let enabled: bool = connection
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();

        assert!(enabled);
    }

    #[test]
    fn reads_count_as_unsigned() {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();

        let count = connection.query_row("SELECT COUNT(id) FROM wallet", [], read_count);
        let negative = connection.query_row("SELECT -1", [], read_count);

        assert_eq!(count, Ok(0));
        assert!(matches!(
            negative,
            Err(rusqlite::Error::IntegralValueOutOfRange(0, -1))
        ));
    }
}
