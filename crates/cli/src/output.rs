use std::env;

use eyre::{eyre, Result};

/// build a standardized output path for the given parameters. follows the following cases:
/// - if `output` is the default value (`output`), return `{cwd}/output/{filename}`
/// - if `output` is specified, return `{output}/{filename}`
pub(crate) fn build_output_path(output: &str, filename: &str) -> Result<String> {
    // if output is the default value, build a path in the working directory
    if output == "output" {
        let cwd = env::current_dir()?
            .into_os_string()
            .into_string()
            .map_err(|_| eyre!("Unable to get current working directory"))?;

        return Ok(format!("{}/output/{}", cwd, filename));
    }

    // output is specified, return the path
    Ok(format!("{}/{}", output, filename))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_default() {
        let path = build_output_path("output", "result.json");
        assert!(path.expect("failed to build output path").ends_with("/output/result.json"));
    }

    #[test]
    fn test_output_specified() {
        let path = build_output_path("/some_dir", "result.json");
        assert_eq!(path.expect("failed to build output path"), "/some_dir/result.json".to_string());
    }
}
