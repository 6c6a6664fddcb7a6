use std::fmt;

/// Machine-readable error codes surfaced by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    InvalidConfig,
    ConfigParseError,
    RunFileMalformed,
    TopicsMalformed,
    InputNotFound,
    RetrievalFailed,
    QueryCancelled,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::InvalidConfig => "E1001",
            Self::ConfigParseError => "E1002",
            Self::RunFileMalformed => "E2001",
            Self::TopicsMalformed => "E2002",
            Self::InputNotFound => "E2003",
            Self::RetrievalFailed => "E3001",
            Self::QueryCancelled => "E3002",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Optional remediation hint.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::InvalidConfig => Some(
                "Use a known method (rrf, linear-interpolation, average, normalize) and positive k/depth/top-k.",
            ),
            Self::ConfigParseError => Some("Fix syntax in rankfuse.toml and retry."),
            Self::RunFileMalformed => {
                Some("Run lines must be `qid Q0 docid rank score tag` with a numeric score.")
            }
            Self::TopicsMalformed => Some("Topics lines must be `qid<TAB>query`."),
            Self::InputNotFound => Some("Check the path and retry."),
            Self::RetrievalFailed => None,
            Self::QueryCancelled => None,
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
