use std::fs;
use std::io;
use std::path::Path;

/// Reads the first line of a text or key file, without its line terminator.
///
/// Anything after the first newline is ignored, as is a trailing carriage return.
pub(crate) fn read_payload(path: &Path) -> io::Result<Vec<u8>> {
    let mut contents = fs::read(path)?;
    if let Some(end) = contents.iter().position(|&b| b == b'\n') {
        contents.truncate(end);
    }
    if contents.last() == Some(&b'\r') {
        contents.pop();
    }
    Ok(contents)
}
