use std::{
    fs::File,
    io::{Read, Write},
    path::Path,
};

use eyre::Result;

/// Write contents to a file on the disc, creating parent directories as needed.
///
/// ```no_run
/// use meridian_common::utils::io::file::write_file;
///
/// let path = "/tmp/meridian/test.txt";
/// let result = write_file(path, "Hello, World!");
/// ```
pub fn write_file(path_str: &str, contents: &str) -> Result<()> {
    let path = Path::new(path_str);

    // Create the directory if it doesn't exist
    std::fs::create_dir_all(
        path.parent().ok_or_else(|| eyre::eyre!("unable to create directory"))?,
    )?;

    let mut file = File::create(path)?;
    file.write_all(contents.as_bytes())?;

    Ok(())
}

/// Read contents from a file on the disc
///
/// ```no_run
/// use meridian_common::utils::io::file::read_file;
///
/// let contents = read_file("/tmp/meridian/test.txt");
/// ```
pub fn read_file(path: &str) -> Result<String> {
    let path = Path::new(path);
    let mut file = File::open(path)?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    Ok(contents)
}

/// Delete a file from the disc. Returns `false` if nothing was deleted.
///
/// ```no_run
/// use meridian_common::utils::io::file::delete_path;
///
/// let deleted = delete_path("/tmp/meridian/test.txt");
/// ```
pub fn delete_path(path: &str) -> bool {
    let path = Path::new(path);
    if path.is_dir() {
        std::fs::remove_dir_all(path).is_ok()
    } else {
        std::fs::remove_file(path).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_read_file() {
        let path = std::env::temp_dir().join("meridian-common-test").join("roundtrip.txt");
        let path = path.to_str().expect("temp path is utf-8");

        write_file(path, "Hello, World!").expect("unable to write file");
        assert_eq!(read_file(path).expect("unable to read file"), "Hello, World!");
        assert!(delete_path(path));
        assert!(read_file(path).is_err());
    }

    #[test]
    fn test_delete_missing_path() {
        let path = std::env::temp_dir().join("meridian-common-test").join("missing.txt");
        assert!(!delete_path(path.to_str().expect("temp path is utf-8")));
    }
}
