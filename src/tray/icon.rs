//! Tray icon management

use tray_icon::Icon;

/// Embedded icon for dark menu bar (white glyph)
const ICON_DARK_DATA: &[u8] = include_bytes!("../../assets/icons/tray_dark.png");

/// Embedded icon for light menu bar (black glyph)
const ICON_LIGHT_DATA: &[u8] = include_bytes!("../../assets/icons/tray_light.png");

/// Tray icon wrapper with support for light/dark menu bars
pub struct TrayIcon {
    /// Icon for dark menu bar
    pub dark: Icon,
    /// Icon for light menu bar
    pub light: Icon,
}

impl TrayIcon {
    /// Create tray icons from embedded data
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            dark: load_icon_from_png(ICON_DARK_DATA)?,
            light: load_icon_from_png(ICON_LIGHT_DATA)?,
        })
    }

    /// Get the icon matching the current system appearance
    pub fn current(&self) -> &Icon {
        if is_dark_mode() {
            &self.dark
        } else {
            &self.light
        }
    }
}

/// Detect if macOS is in dark mode
#[cfg(target_os = "macos")]
pub fn is_dark_mode() -> bool {
    use cocoa::base::{id, nil};
    use cocoa::foundation::NSString;
    use objc::{msg_send, sel, sel_impl};

    unsafe {
        let user_defaults: id = msg_send![objc::class!(NSUserDefaults), standardUserDefaults];
        let key = NSString::alloc(nil).init_str("AppleInterfaceStyle");
        let value: id = msg_send![user_defaults, stringForKey: key];

        if value == nil {
            // No value means light mode (default)
            false
        } else {
            let utf8: *const i8 = msg_send![value, UTF8String];
            if utf8.is_null() {
                false
            } else {
                let style = std::ffi::CStr::from_ptr(utf8).to_string_lossy();
                style == "Dark"
            }
        }
    }
}

#[cfg(not(target_os = "macos"))]
pub fn is_dark_mode() -> bool {
    // Default to dark mode on other platforms
    true
}

/// Load an icon from PNG data
fn load_icon_from_png(data: &[u8]) -> anyhow::Result<Icon> {
    let decoder = png::Decoder::new(std::io::Cursor::new(data));
    let mut reader = decoder.read_info()?;

    let mut buf = vec![0; reader.output_buffer_size()];
    let info = reader.next_frame(&mut buf)?;
    buf.truncate(info.buffer_size());

    let rgba_data = match info.color_type {
        png::ColorType::Rgba => buf,
        png::ColorType::Rgb => {
            let mut rgba = Vec::with_capacity(buf.len() * 4 / 3);
            for chunk in buf.chunks(3) {
                rgba.extend_from_slice(chunk);
                rgba.push(255);
            }
            rgba
        }
        png::ColorType::GrayscaleAlpha => {
            let mut rgba = Vec::with_capacity(buf.len() * 2);
            for chunk in buf.chunks(2) {
                let gray = chunk[0];
                let alpha = chunk[1];
                rgba.extend_from_slice(&[gray, gray, gray, alpha]);
            }
            rgba
        }
        png::ColorType::Grayscale => {
            let mut rgba = Vec::with_capacity(buf.len() * 4);
            for &gray in &buf {
                rgba.extend_from_slice(&[gray, gray, gray, 255]);
            }
            rgba
        }
        png::ColorType::Indexed => {
            anyhow::bail!("Indexed color not supported");
        }
    };

    Icon::from_rgba(rgba_data, info.width, info.height)
        .map_err(|e| anyhow::anyhow!("Failed to create icon: {}", e))
}
