//! Local Chromium detection and install guidance.

use std::path::PathBuf;

/// Executable names searched on `PATH`, most common server installs first.
const CHROMIUM_EXECUTABLES: &[&str] = &[
    "chromium",
    "chromium-browser",
    "google-chrome",
    "google-chrome-stable",
    "chrome",
    "microsoft-edge",
    "microsoft-edge-stable",
    "brave-browser",
];

/// Fixed install locations checked before `PATH`.
#[cfg(target_os = "macos")]
const PLATFORM_PATHS: &[&str] = &[
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
];

#[cfg(target_os = "windows")]
const PLATFORM_PATHS: &[&str] = &[
    r"C:\Program Files\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
];

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
const PLATFORM_PATHS: &[&str] = &["/usr/bin/chromium", "/usr/lib/chromium/chromium"];

/// Locate a Chromium-based browser executable.
///
/// Checks, in order: the configured path, the `CHROME` environment variable,
/// platform install locations, then known executable names on `PATH`.
/// On failure the error carries install guidance.
pub fn detect_browser(custom_path: Option<&str>) -> Result<PathBuf, String> {
    let configured = custom_path
        .map(PathBuf::from)
        .into_iter()
        .chain(std::env::var_os("CHROME").map(PathBuf::from))
        .chain(PLATFORM_PATHS.iter().map(PathBuf::from));

    for candidate in configured {
        if candidate.exists() {
            return Ok(candidate);
        }
    }

    CHROMIUM_EXECUTABLES
        .iter()
        .find_map(|name| which::which(name).ok())
        .ok_or_else(install_instructions)
}

/// Platform-specific install instructions.
pub fn install_instructions() -> String {
    let instructions = if cfg!(target_os = "macos") {
        "  brew install --cask chromium"
    } else if cfg!(target_os = "windows") {
        "  winget install Google.Chrome"
    } else {
        "  Debian/Ubuntu: sudo apt install chromium\n  \
         Alpine:        apk add chromium\n  \
         Fedora:        sudo dnf install chromium"
    };

    format!(
        "No Chromium-based browser found. Install one:\n\n\
         {instructions}\n\n\
         Or point CHROME_EXECUTABLE_PATH at the binary, or configure a remote\n\
         browser with BROWSERLESS_WS_ENDPOINT / BROWSERLESS_URL."
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn install_instructions_mention_alternatives() {
        let hint = install_instructions();
        assert!(hint.contains("CHROME_EXECUTABLE_PATH"));
        assert!(hint.contains("BROWSERLESS_WS_ENDPOINT"));
    }

    #[test]
    fn configured_path_wins() {
        let dir = tempfile::tempdir().unwrap();
        let fake = dir.path().join("fake-chromium");
        std::fs::write(&fake, "#!/bin/sh\n").unwrap();

        let found = detect_browser(Some(fake.to_str().unwrap())).unwrap();
        assert_eq!(found, fake);
    }

    #[test]
    fn missing_configured_path_falls_through() {
        match detect_browser(Some("/nonexistent/readproxy/chrome")) {
            Ok(path) => assert_ne!(path, PathBuf::from("/nonexistent/readproxy/chrome")),
            Err(hint) => assert!(hint.contains("No Chromium-based browser found")),
        }
    }
}
