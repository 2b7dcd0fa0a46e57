use std::path::{Path, PathBuf};
use tracing::warn;

/// Image files for the dashboard, resolved against one directory.
#[derive(Debug, Clone)]
pub struct AssetCatalog {
    dir: PathBuf,
}

/// An animal class as shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassIcon {
    pub class: String,
    pub icon: PathBuf,
    pub present: bool,
}

impl AssetCatalog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `<dir>/<name>.png`; `name` carries no extension.
    pub fn png(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.png"))
    }

    /// `<dir>/<file>`, for assets referenced with their extension (e.g. `login.jpg`).
    pub fn image(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    /// One entry per configured class, in order.
    pub fn class_icons(&self, classes: &[String]) -> Vec<ClassIcon> {
        classes
            .iter()
            .map(|class| {
                let icon = self.png(class);
                let present = icon.is_file();
                if !present {
                    warn!(class = %class, path = %icon.display(), "icon not found");
                }
                ClassIcon {
                    class: class.clone(),
                    icon,
                    present,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn png_lookup_by_bare_name() {
        let catalog = AssetCatalog::new("/opt/img");
        assert_eq!(catalog.png("mammals"), PathBuf::from("/opt/img/mammals.png"));
        assert_eq!(catalog.image("login.jpg"), PathBuf::from("/opt/img/login.jpg"));
    }

    #[test]
    fn class_icons_flag_missing_files() {
        let dir = std::env::temp_dir().join(format!("animal-logger-assets-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("birds.png"), b"png").unwrap();

        let catalog = AssetCatalog::new(&dir);
        let icons = catalog.class_icons(&["birds".to_string(), "fish".to_string()]);
        assert_eq!(icons.len(), 2);
        assert!(icons[0].present);
        assert!(!icons[1].present);
        assert_eq!(icons[1].icon, dir.join("fish.png"));

        let _ = fs::remove_dir_all(&dir);
    }
}
