use normalize_line_endings::normalized;
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::iter::FromIterator;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub fn path_exists<P: AsRef<Path>>(path: P) -> bool {
    std::fs::metadata(path.as_ref()).is_ok()
}

pub fn read_file<P: AsRef<Path>>(path: P) -> io::Result<Vec<u8>> {
    let mut file = File::open(path)?;
    let meta = file.metadata()?;
    let size = meta.len() as usize;
    let mut data = vec![0; size];
    file.read_exact(&mut data)?;
    Ok(data)
}

pub fn read_file_string<P: AsRef<Path>>(path: P) -> io::Result<String> {
    let mut file = File::open(path.as_ref())?;
    let mut text = String::new();
    if let Ok(meta) = file.metadata() {
        text.reserve(meta.len() as usize); // Safe to truncate, since it's only a suggestion
    }
    file.read_to_string(&mut text)?;
    let text = String::from_iter(normalized(text.chars()));
    Ok(text)
}

pub fn write_file<P: AsRef<Path>>(path: P, data: &[u8]) -> io::Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(data)?;
    writer.flush()
}

/// Scratch directory with a random name, removed again on drop.
pub struct TempDir {
    path: PathBuf,
}

impl TempDir {
    pub fn new(temp_path: &Path) -> Self {
        Self {
            path: temp_path.join(Uuid::new_v4().to_string()),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn create(&self) -> io::Result<()> {
        std::fs::create_dir_all(&self.path)
    }

    pub fn exists(&self) -> bool {
        path_exists(&self.path)
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        if self.exists() {
            if let Err(err) = std::fs::remove_dir_all(&self.path) {
                panic!(
                    "Error occurred trying to delete temp dir! path: {:?} - {:?}",
                    self.path, err
                );
            }
        }
    }
}
