pub mod file;
pub mod stdin;

use serde::de::DeserializeOwned;

/// Load a full input document from `--input <file>` or, failing that, piped
/// stdin. `Ok(None)` means neither was supplied and flags should be used.
pub fn load<T: DeserializeOwned>(path: Option<&str>) -> Result<Option<T>, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        return file::read_input(path).map(Some);
    }
    stdin::read_stdin()
}
