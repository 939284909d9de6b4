//! Shared fixtures for unit tests

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

/// Encode a 24-bit bottom-up BMP, `lit` pixels white and the rest black
pub fn encode_bmp(width: u32, height: u32, lit: impl Fn(u32, u32) -> bool) -> Vec<u8> {
    let row_size = (width * 3).div_ceil(4) * 4;
    let image_size = row_size * height;
    let file_size = 14 + 40 + image_size;

    let mut bytes = Vec::with_capacity(file_size as usize);
    bytes.extend_from_slice(b"BM");
    bytes.extend_from_slice(&file_size.to_le_bytes());
    bytes.extend_from_slice(&[0; 4]);
    bytes.extend_from_slice(&54u32.to_le_bytes());

    bytes.extend_from_slice(&40u32.to_le_bytes());
    bytes.extend_from_slice(&(width as i32).to_le_bytes());
    bytes.extend_from_slice(&(height as i32).to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&24u16.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&image_size.to_le_bytes());
    bytes.extend_from_slice(&2835u32.to_le_bytes());
    bytes.extend_from_slice(&2835u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());

    for y in (0..height).rev() {
        let start = bytes.len();
        for x in 0..width {
            let value = if lit(x, y) { 0xFF } else { 0x00 };
            bytes.extend_from_slice(&[value; 3]);
        }
        bytes.resize(start + row_size as usize, 0);
    }
    bytes
}

/// Every pixel the same
pub fn solid(lit: bool) -> impl Fn(u32, u32) -> bool {
    move |_, _| lit
}

/// Checkerboard with the top-left pixel lit
pub fn checker() -> impl Fn(u32, u32) -> bool {
    |x, y| (x + y) % 2 == 0
}

/// Temporary directory holding one or more asset roots
pub struct AssetTree {
    dir: TempDir,
}

impl AssetTree {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    /// Path of a named root (not created until something is written to it)
    pub fn root(&self, root: &str) -> PathBuf {
        self.dir.path().join(root)
    }

    /// Write arbitrary bytes at `relative` under a root
    pub fn raw(&self, root: &str, relative: &str, bytes: &[u8]) {
        let path = self.root(root).join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, bytes).unwrap();
    }

    /// Write one animation frame
    pub fn frame(
        &self,
        root: &str,
        animation: &str,
        file: &str,
        width: u32,
        height: u32,
        lit: impl Fn(u32, u32) -> bool,
    ) {
        let relative = format!("animations/{animation}/{file}");
        self.raw(root, &relative, &encode_bmp(width, height, lit));
    }

    /// Write one icon
    pub fn icon(
        &self,
        root: &str,
        name: &str,
        width: u32,
        height: u32,
        lit: impl Fn(u32, u32) -> bool,
    ) {
        let relative = format!("icons/{name}.bmp");
        self.raw(root, &relative, &encode_bmp(width, height, lit));
    }
}
