//! JSON配列ファイルへの追記
//!
//! 既存ファイルがあれば閉じ括弧を取り除いて続きから書き、
//! `finish`で配列を閉じる。

use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::Path;

pub struct JsonArrayFile {
    file: File,
    is_first: bool,
}

impl JsonArrayFile {
    /// ファイルを開く（なければ作成）
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let mut file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(path)?;

        let existing = std::fs::read_to_string(path)?;
        let trimmed = existing.trim_end();

        let is_first = if trimmed.is_empty() {
            file.write_all(b"[\n")?;
            true
        } else {
            let body = trimmed.strip_suffix(']').unwrap_or(trimmed).trim_end();
            file.set_len(body.len() as u64)?;
            file.seek(SeekFrom::End(0))?;
            if body == "[" {
                file.write_all(b"\n")?;
                true
            } else {
                false
            }
        };

        Ok(Self { file, is_first })
    }

    /// 要素を1つ書き込む
    pub fn write_item<T: Serialize>(&mut self, item: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(item)?;
        let indented = json
            .lines()
            .map(|line| format!("  {}", line))
            .collect::<Vec<_>>()
            .join("\n");

        if !self.is_first {
            self.file.write_all(b",\n")?;
        }
        self.file.write_all(indented.as_bytes())?;
        self.file.flush()?;
        self.is_first = false;
        Ok(())
    }

    /// 配列を閉じる
    pub fn finish(mut self) -> io::Result<()> {
        self.file.write_all(b"\n]\n")?;
        self.file.sync_all()
    }
}
