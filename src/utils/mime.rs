//! 文件扩展名 → MIME 类型对照表

use std::path::Path;

/// 视觉请求支持的图片类型
static IMAGE_MIME_TYPES: phf::Map<&'static str, &'static str> = phf::phf_map! {
    "png" => "image/png",
    "jpg" => "image/jpeg",
    "jpeg" => "image/jpeg",
    "webp" => "image/webp",
    "gif" => "image/gif",
};

/// 根据扩展名查 MIME 类型（大小写不敏感）
pub fn image_mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    IMAGE_MIME_TYPES.get(ext.as_str()).copied()
}

/// 路径是否指向支持的图片文件
pub fn is_image_path(path: &Path) -> bool {
    image_mime_for_path(path).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_lookup() {
        assert_eq!(
            image_mime_for_path(Path::new("scan.PNG")),
            Some("image/png")
        );
        assert_eq!(
            image_mime_for_path(Path::new("page.jpeg")),
            Some("image/jpeg")
        );
        assert_eq!(image_mime_for_path(Path::new("paper.pdf")), None);
        assert!(!is_image_path(Path::new("noext")));
    }
}
