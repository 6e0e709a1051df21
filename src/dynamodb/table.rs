/// DynamoDB table configuration.
///
/// A table is named, keyed by a single string hash key, and created in
/// provisioned capacity mode with fixed read and write units.
///
/// # Example
///
/// ```
/// let table = Table::new("my_table", "id").with_throughput(Throughput::new(5, 5));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    name: String,
    hash_key: String,
    throughput: Throughput,
}

/// Provisioned read/write capacity units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throughput {
    pub read_capacity_units: i64,
    pub write_capacity_units: i64,
}

impl Throughput {
    pub fn new(read_capacity_units: i64, write_capacity_units: i64) -> Self {
        Self {
            read_capacity_units,
            write_capacity_units,
        }
    }
}

impl Default for Throughput {
    fn default() -> Self {
        Self::new(5, 5)
    }
}

impl Table {
    /// Creates a new `Table` with the default throughput.
    pub fn new(name: impl Into<String>, hash_key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hash_key: hash_key.into(),
            throughput: Throughput::default(),
        }
    }

    /// Returns the name of the table.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the hash key attribute name.
    pub fn hash_key(&self) -> &str {
        &self.hash_key
    }

    pub fn throughput(&self) -> Throughput {
        self.throughput
    }

    /// Sets the provisioned throughput and returns the modified `Table`.
    pub fn with_throughput(mut self, throughput: Throughput) -> Self {
        self.throughput = throughput;
        self
    }
}

/// A table that is known to exist remotely, as returned by
/// [`ensure_table`](crate::lifecycle::ensure_table).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableHandle {
    name: String,
    hash_key: String,
    created: bool,
}

impl TableHandle {
    pub fn new(table: &Table, created: bool) -> Self {
        Self {
            name: table.name().to_string(),
            hash_key: table.hash_key().to_string(),
            created,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn hash_key(&self) -> &str {
        &self.hash_key
    }

    /// Whether this run created the table, as opposed to reusing it.
    pub fn created(&self) -> bool {
        self.created
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_defaults_to_five_units() {
        let table = Table::new("my_table", "id");
        assert_eq!(table.name(), "my_table");
        assert_eq!(table.hash_key(), "id");
        assert_eq!(table.throughput(), Throughput::new(5, 5));

        let table = table.with_throughput(Throughput::new(10, 2));
        assert_eq!(table.throughput().read_capacity_units, 10);
        assert_eq!(table.throughput().write_capacity_units, 2);
    }

    #[test]
    fn handle_copies_table_identity() {
        let handle = TableHandle::new(&Table::new("t", "pk"), false);
        assert_eq!(handle.name(), "t");
        assert_eq!(handle.hash_key(), "pk");
        assert!(!handle.created());
    }
}
