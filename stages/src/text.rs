//! Line items shared by the text stages.

use crate::error::StageError;

/// One line of text, or the failure that replaced it.
pub type Line = Result<String, StageError>;

/// Items a text stage accepts as input.
pub trait TextItem {
    fn into_line(self) -> Line;
}

impl TextItem for String {
    fn into_line(self) -> Line {
        Ok(self)
    }
}

impl TextItem for &str {
    fn into_line(self) -> Line {
        Ok(self.to_owned())
    }
}

impl TextItem for Line {
    fn into_line(self) -> Line {
        self
    }
}
