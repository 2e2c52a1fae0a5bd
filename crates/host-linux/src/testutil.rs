use std::fs;
use std::os::unix::fs::symlink;
use std::path::PathBuf;
use uuid::Uuid;

/// Scratch sysfs-like tree under the system temp dir, removed on drop.
pub struct Fixture {
    pub root: PathBuf,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_prefix("blkreport")
    }

    pub fn with_prefix(prefix: &str) -> Self {
        let root = std::env::temp_dir().join(format!("{}-{}", prefix, Uuid::new_v4()));
        fs::create_dir_all(root.join("block")).unwrap();
        Self { root }
    }

    pub fn block_root(&self) -> PathBuf {
        self.root.join("block")
    }

    pub fn mkdir(&self, relative: &str) -> PathBuf {
        let path = self.root.join(relative);
        fs::create_dir_all(&path).unwrap();
        path
    }

    pub fn write(&self, relative: &str, contents: &str) -> PathBuf {
        let path = self.root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, contents).unwrap();
        path
    }

    /// Creates the device directory and links `block/<name>` to it the
    /// way the kernel does, with a relative target.
    pub fn link_block(&self, name: &str, device_dir: &str) -> PathBuf {
        let dir = self.mkdir(device_dir);
        symlink(format!("../{}", device_dir), self.block_root().join(name)).unwrap();
        dir
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.root);
    }
}
