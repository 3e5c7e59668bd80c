use rand::Rng;

/// zxパラメータに使う文字集合
const ZX_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// zxパラメータの長さ
const ZX_LEN: usize = 16;

/// APIキーをマスキングしてログ出力用の文字列を生成
///
/// APIキーの最初の4文字と最後の4文字のみを表示し、中間を***でマスキング
///
/// # Examples
/// ```
/// use chat_scraper_lib::util::mask_api_key;
///
/// let masked = mask_api_key("AIzaSyABC123def456GHI789");
/// assert_eq!(masked, "AIza***I789");
/// ```
pub fn mask_api_key(api_key: &str) -> String {
    let len = api_key.len();
    if len <= 8 || !api_key.is_ascii() {
        return "***".to_string();
    }

    format!("{}***{}", &api_key[..4], &api_key[len - 4..])
}

/// キャッシュ回避用のリクエスト識別子（16文字の英小文字・数字）を生成
pub fn generate_zx() -> String {
    let mut rng = rand::thread_rng();
    (0..ZX_LEN)
        .map(|_| ZX_CHARSET[rng.gen_range(0..ZX_CHARSET.len())] as char)
        .collect()
}

/// HTML属性値の代表的な文字参照を復元
pub fn unescape_html(value: &str) -> String {
    if !value.contains('&') {
        return value.to_string();
    }

    value
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_api_key() {
        // 通常のAPIキー
        assert_eq!(mask_api_key("AIzaSyABC123def456GHI789"), "AIza***I789");

        // 短いキー
        assert_eq!(mask_api_key("short"), "***");

        // 空文字列
        assert_eq!(mask_api_key(""), "***");

        // 8文字ちょうど
        assert_eq!(mask_api_key("12345678"), "***");

        // 9文字（マスキング開始）
        assert_eq!(mask_api_key("123456789"), "1234***6789");
    }

    #[test]
    fn test_generate_zx_shape() {
        let zx = generate_zx();
        assert_eq!(zx.len(), 16);
        assert!(zx
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_generate_zx_varies() {
        // 36^16通りなので連続生成で一致することは事実上ない
        assert_ne!(generate_zx(), generate_zx());
    }

    #[test]
    fn test_unescape_html() {
        assert_eq!(unescape_html("Tom &amp; Jerry"), "Tom & Jerry");
        assert_eq!(unescape_html("&quot;hi&quot; &#39;x&#39;"), "\"hi\" 'x'");
        assert_eq!(unescape_html("&amp;lt;"), "&lt;");
        assert_eq!(unescape_html("plain"), "plain");
    }
}
