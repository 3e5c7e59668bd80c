//! Netscape形式のクッキーファイル読み込み

use std::path::Path;

use super::errors::YouTubeError;

/// クッキー1件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub domain: String,
    pub path: String,
    pub secure: bool,
    /// 有効期限（Unix秒）
    pub expires: i64,
    pub name: String,
    pub value: String,
}

/// 読み込んだクッキー一式
#[derive(Debug, Clone, Default)]
pub struct Cookies {
    cookies: Vec<Cookie>,
    header: String,
}

impl Cookies {
    /// ファイルから読み込む
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, YouTubeError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            YouTubeError::Cookie(format!("failed to open {}: {}", path.display(), e))
        })?;
        let cookies = Self::parse(&content);
        log::info!("Loaded {} cookies from {}", cookies.len(), path.display());
        Ok(cookies)
    }

    /// cookies.txtの内容をパース
    ///
    /// コメント行・空行・フィールド数が7でない行は無視する。
    pub fn parse(content: &str) -> Self {
        let cookies: Vec<Cookie> = content
            .lines()
            .filter(|line| !line.starts_with('#') && !line.trim().is_empty())
            .filter_map(parse_line)
            .collect();

        let header = cookies
            .iter()
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; ");

        Self { cookies, header }
    }

    /// Cookieヘッダー値
    pub fn header_value(&self) -> Option<&str> {
        if self.header.is_empty() {
            None
        } else {
            Some(&self.header)
        }
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cookie> {
        self.cookies.iter()
    }
}

fn parse_line(line: &str) -> Option<Cookie> {
    let parts: Vec<&str> = line.split('\t').collect();
    if parts.len() != 7 {
        return None;
    }

    let expires = match parts[4].parse::<i64>() {
        Ok(ts) => ts,
        Err(e) => {
            log::warn!("Error parsing cookie expiry '{}': {}", parts[4], e);
            return None;
        }
    };

    Some(Cookie {
        domain: parts[0].to_string(),
        path: parts[2].to_string(),
        secure: parts[3] == "TRUE",
        expires,
        name: parts[5].to_string(),
        value: parts[6].to_string(),
    })
}
