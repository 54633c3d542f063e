//! Elements of the live search result stream.

/// One delta on an open search result stream.
///
/// Line numbers are zero-based; positions are zero-based character offsets
/// of query-match starts within the line. `Complete` terminates the
/// stream: no further elements follow it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchResult {
    Add {
        file_path: String,
        line_number: usize,
        positions: Vec<usize>,
    },
    Update {
        file_path: String,
        line_number: usize,
        positions: Vec<usize>,
    },
    Remove {
        file_path: String,
        line_number: usize,
    },
    Complete,
}
