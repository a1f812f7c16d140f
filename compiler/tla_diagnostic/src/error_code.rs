use std::fmt;

/// Error codes for parser diagnostics.
///
/// Format: E1xxx (parser phase). Each variant corresponds to one entry in
/// the failure taxonomy of the parsing layer.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ErrorCode {
    /// Expected a specific token or lexical form.
    E1001,
    /// A match was found below the ambient minimum column.
    E1002,
    /// Every branch of an alternation failed.
    E1003,
    /// Failure after a committed parse (a crossed cut).
    E1004,
}

impl ErrorCode {
    /// The code as it appears in rendered diagnostics.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::E1001 => "E1001",
            ErrorCode::E1002 => "E1002",
            ErrorCode::E1003 => "E1003",
            ErrorCode::E1004 => "E1004",
        }
    }

    /// A short description of the error class.
    pub fn description(self) -> &'static str {
        match self {
            ErrorCode::E1001 => "expected token mismatch",
            ErrorCode::E1002 => "token below minimum column",
            ErrorCode::E1003 => "no viable alternative",
            ErrorCode::E1004 => "invalid syntax after committed parse",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
