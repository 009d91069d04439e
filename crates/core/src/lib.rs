#![forbid(unsafe_code)]

pub mod ids {
    /// Words the embedded engine treats as keywords. Identifiers matching one of
    /// these (case-insensitively) are rejected up front instead of being quoted
    /// through, so a table can never shadow SQL syntax in user-visible errors.
    const RESERVED_WORDS: &[&str] = &[
        "select", "table", "create", "drop", "alter", "insert", "update", "delete", "from",
        "where", "pragma", "index", "view",
    ];

    #[derive(Clone, Debug, PartialEq, Eq, Hash)]
    pub struct TableName(String);

    impl TableName {
        pub fn as_str(&self) -> &str {
            &self.0
        }

        pub fn try_new(value: impl Into<String>) -> Result<Self, NameError> {
            let value = value.into();
            validate_identifier(&value, IdentKind::Table)?;
            Ok(Self(value))
        }

        /// The identifier wrapped in double quotes for interpolation into an
        /// engine statement. Validation already excludes `"` so no escaping is
        /// needed beyond the quoting itself.
        pub fn quoted(&self) -> String {
            format!("\"{}\"", self.0)
        }

        /// Filename of the CSV file backing this table.
        pub fn file_name(&self) -> String {
            format!("{}.csv", self.0)
        }
    }

    impl std::fmt::Display for TableName {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(&self.0)
        }
    }

    #[derive(Clone, Debug, PartialEq, Eq, Hash)]
    pub struct WorkspaceName(String);

    impl WorkspaceName {
        pub fn as_str(&self) -> &str {
            &self.0
        }

        pub fn try_new(value: impl Into<String>) -> Result<Self, NameError> {
            let value = value.into();
            validate_identifier(&value, IdentKind::Workspace)?;
            Ok(Self(value))
        }
    }

    impl std::fmt::Display for WorkspaceName {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(&self.0)
        }
    }

    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum NameError {
        Empty,
        TooLong,
        InvalidFirstChar,
        InvalidChar { ch: char, index: usize },
        ReservedWord,
    }

    impl std::fmt::Display for NameError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Self::Empty => write!(f, "name must not be empty"),
                Self::TooLong => write!(f, "name must be 64 characters or fewer"),
                Self::InvalidFirstChar => {
                    write!(f, "name must start with an ASCII letter or underscore")
                }
                Self::InvalidChar { ch, index } => {
                    write!(f, "invalid character {ch:?} at index {index}")
                }
                Self::ReservedWord => write!(f, "name collides with an SQL keyword"),
            }
        }
    }

    impl std::error::Error for NameError {}

    #[derive(Clone, Copy)]
    enum IdentKind {
        Table,
        Workspace,
    }

    fn validate_identifier(value: &str, kind: IdentKind) -> Result<(), NameError> {
        if value.is_empty() {
            return Err(NameError::Empty);
        }
        if value.len() > 64 {
            return Err(NameError::TooLong);
        }
        let mut chars = value.chars();
        let Some(first) = chars.next() else {
            return Err(NameError::Empty);
        };
        if !(first.is_ascii_alphabetic() || first == '_') {
            return Err(NameError::InvalidFirstChar);
        }
        for (index, ch) in value.chars().enumerate() {
            if index == 0 {
                continue;
            }
            let ok = match kind {
                IdentKind::Table => ch.is_ascii_alphanumeric() || ch == '_',
                // Workspace names double as directory names; dots and dashes are
                // fine there, path separators never are.
                IdentKind::Workspace => ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | '.'),
            };
            if !ok {
                return Err(NameError::InvalidChar { ch, index });
            }
        }
        if RESERVED_WORDS
            .iter()
            .any(|word| value.eq_ignore_ascii_case(word))
        {
            return Err(NameError::ReservedWord);
        }
        Ok(())
    }
}

pub mod model {
    /// A rectangular in-memory table: ordered columns, rows of string cells.
    /// Cell typing is deferred to the engine; the dataset itself only enforces
    /// shape.
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct Dataset {
        columns: Vec<String>,
        rows: Vec<Vec<String>>,
    }

    impl Dataset {
        pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self, DatasetError> {
            if columns.is_empty() {
                return Err(DatasetError::NoColumns);
            }
            for (index, column) in columns.iter().enumerate() {
                if columns[..index]
                    .iter()
                    .any(|seen| seen.eq_ignore_ascii_case(column))
                {
                    return Err(DatasetError::DuplicateColumn {
                        name: column.clone(),
                    });
                }
            }
            for (row, cells) in rows.iter().enumerate() {
                if cells.len() != columns.len() {
                    return Err(DatasetError::RaggedRow {
                        row,
                        expected: columns.len(),
                        actual: cells.len(),
                    });
                }
            }
            Ok(Self { columns, rows })
        }

        pub fn columns(&self) -> &[String] {
            &self.columns
        }

        pub fn rows(&self) -> &[Vec<String>] {
            &self.rows
        }

        pub fn row_count(&self) -> usize {
            self.rows.len()
        }
    }

    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum DatasetError {
        NoColumns,
        DuplicateColumn {
            name: String,
        },
        RaggedRow {
            row: usize,
            expected: usize,
            actual: usize,
        },
    }

    impl std::fmt::Display for DatasetError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Self::NoColumns => write!(f, "dataset must have at least one column"),
                Self::DuplicateColumn { name } => {
                    write!(f, "duplicate column name {name:?}")
                }
                Self::RaggedRow {
                    row,
                    expected,
                    actual,
                } => write!(f, "row {row} has {actual} cells, expected {expected}"),
            }
        }
    }

    impl std::error::Error for DatasetError {}
}
