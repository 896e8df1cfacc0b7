/// Which halves of the pipeline run for each table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSettings {
    pub extract: bool,
    pub load: bool,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            extract: true,
            load: true,
        }
    }
}
