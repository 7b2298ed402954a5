//! Host platform conventions that change how tools are laid out and launched

/// The two platform families the workbench distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// Command shims (`.cmd`/`.bat`/`.ps1`), `Scripts` dirs, `;` PATH separator
    Windows,
    /// Everything else
    Unix,
}

impl Platform {
    /// Platform this binary was compiled for
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Unix
        }
    }

    pub fn is_windows(self) -> bool {
        matches!(self, Platform::Windows)
    }

    /// PATH list separator
    pub fn path_separator(self) -> char {
        match self {
            Platform::Windows => ';',
            Platform::Unix => ':',
        }
    }

    /// Split a PATH value into its non-empty entries
    pub fn split_path(self, value: &str) -> Vec<String> {
        value
            .split(self.path_separator())
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Join PATH entries back into a single value
    pub fn join_path(self, parts: &[String]) -> String {
        parts.join(&self.path_separator().to_string())
    }

    /// Name of the executables directory inside a pip `--prefix`
    pub fn scripts_dir_name(self) -> &'static str {
        match self {
            Platform::Windows => "Scripts",
            Platform::Unix => "bin",
        }
    }

    /// Environment variable names compare case-insensitively on Windows
    pub fn env_key_eq(self, a: &str, b: &str) -> bool {
        match self {
            Platform::Windows => a.eq_ignore_ascii_case(b),
            Platform::Unix => a == b,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_round_trip_per_platform() {
        let unix = Platform::Unix;
        assert_eq!(unix.split_path("/a::/b"), vec!["/a", "/b"]);
        assert_eq!(unix.join_path(&["/a".into(), "/b".into()]), "/a:/b");

        let win = Platform::Windows;
        assert_eq!(win.split_path(r"C:\a;C:\b"), vec![r"C:\a", r"C:\b"]);
        assert!(win.env_key_eq("Path", "PATH"));
        assert!(!unix.env_key_eq("Path", "PATH"));
    }
}
