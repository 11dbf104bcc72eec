use crate::contract::canonical_string;
use anyhow::{Context, Result};
use std::{
    fs,
    io::{self, Read},
    path::PathBuf,
};

#[derive(Debug)]
pub struct Args {
    /// `None` reads stdin.
    pub file: Option<PathBuf>,
}

/// Print the canonical JSON form of a file or stdin.
/// # Errors
/// Returns an error if the input cannot be read or is not JSON.
pub fn execute(args: &Args) -> Result<()> {
    let bytes = match &args.file {
        Some(path) => fs::read(path).with_context(|| format!("could not read {}", path.display()))?,
        None => {
            let mut buffer = Vec::new();
            io::stdin()
                .read_to_end(&mut buffer)
                .context("could not read stdin")?;
            buffer
        }
    };

    let canonical = canonical_string(Some(bytes.as_slice())).context("input is not valid JSON")?;
    println!("{canonical}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_json_file() {
        let path = std::env::temp_dir().join(format!("mage-auth-body-{}.txt", uuid::Uuid::new_v4()));
        fs::write(&path, "<html>").unwrap();

        let err = execute(&Args {
            file: Some(path.clone()),
        })
        .unwrap_err();
        assert_eq!(err.to_string(), "input is not valid JSON");

        fs::write(&path, r#"{"b":null,"a":1}"#).unwrap();
        assert!(execute(&Args { file: Some(path.clone()) }).is_ok());

        let _ = fs::remove_file(path);
    }
}
