//! Display modes and the mode service
//!
//! The mode service is the BIOS / VBE interface: it reports a mode's geometry
//! and memory layout, switches modes, and returns to the text console. The
//! tool never programs CRTC timing for a mode itself.

use std::fmt;

use thiserror::Error;

/// A BIOS (below 0x100) or VESA (0x100 and up) mode number.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ModeId(pub u16);

impl ModeId {
    pub const TEXT_80X25: ModeId = ModeId(0x03);
    pub const EGA_640X350X16: ModeId = ModeId(0x10);
    pub const VGA_320X200X256: ModeId = ModeId(0x13);
    pub const VESA_640X400X256: ModeId = ModeId(0x100);
    pub const VESA_640X480X256: ModeId = ModeId(0x101);
    pub const VESA_800X600X256: ModeId = ModeId(0x103);

    pub fn is_vesa(self) -> bool {
        self.0 >= 0x100
    }
}

impl fmt::Display for ModeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_vesa() {
            write!(f, "0x{:03X}", self.0)
        } else {
            write!(f, "0x{:02X}", self.0)
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModeError {
    #[error("VBE 0x4F01 (mode info) failed for mode {mode}: status 0x{status:04X}")]
    Query { mode: ModeId, status: u16 },

    #[error("Mode set failed for mode {mode}: status 0x{status:04X}")]
    SetMode { mode: ModeId, status: u16 },

    #[error("Mode {mode} reports unusable window: granularity {granularity} bytes, size {window_size} bytes")]
    InvalidWindow {
        mode: ModeId,
        granularity: usize,
        window_size: usize,
    },
}

/// Windowed framebuffer parameters reported by VBE function 01h.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BankWindow {
    /// Real-mode segment of window A
    pub segment: u16,
    /// Bytes visible through the window
    pub window_size: usize,
    /// Step between selectable window positions, in bytes
    pub granularity: usize,
    pub bytes_per_scanline: usize,
    /// Physical address of the linear framebuffer, 0 if none
    pub phys_base: u32,
}

impl BankWindow {
    /// Validate window parameters.
    ///
    /// Granularity must be non-zero and no larger than the window, otherwise
    /// some addresses would be unreachable.
    pub fn new(
        mode: ModeId,
        segment: u16,
        window_size: usize,
        granularity: usize,
        bytes_per_scanline: usize,
        phys_base: u32,
    ) -> Result<Self, ModeError> {
        if granularity == 0 || window_size < granularity {
            return Err(ModeError::InvalidWindow {
                mode,
                granularity,
                window_size,
            });
        }
        Ok(Self {
            segment,
            window_size,
            granularity,
            bytes_per_scanline,
            phys_base,
        })
    }
}

/// Memory organisation of a mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemoryModel {
    /// One byte per pixel, whole screen inside the aperture
    Linear { stride: usize },
    /// Four bit planes written through set/reset, 8 pixels per byte
    Planar4bpp { stride: usize },
    /// One byte per pixel behind a movable window
    BankedFramebuffer(BankWindow),
}

impl MemoryModel {
    pub fn name(&self) -> &'static str {
        match self {
            MemoryModel::Linear { .. } => "linear",
            MemoryModel::Planar4bpp { .. } => "planar",
            MemoryModel::BankedFramebuffer(_) => "banked",
        }
    }
}

/// Geometry and memory layout of the active mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DisplayProfile {
    pub width: usize,
    pub height: usize,
    pub bits_per_pixel: u8,
    pub memory_model: MemoryModel,
}

/// Mode query and switching.
pub trait ModeService {
    /// Mode information (VBE function 01h). Only meaningful for VESA modes.
    fn query_profile(&mut self, mode: ModeId) -> Result<DisplayProfile, ModeError>;

    fn set_mode(&mut self, mode: ModeId) -> Result<(), ModeError>;

    /// Return to 80x25 colour text.
    fn restore_text_mode(&mut self);
}

impl<S: ModeService + ?Sized> ModeService for &mut S {
    fn query_profile(&mut self, mode: ModeId) -> Result<DisplayProfile, ModeError> {
        (**self).query_profile(mode)
    }

    fn set_mode(&mut self, mode: ModeId) -> Result<(), ModeError> {
        (**self).set_mode(mode)
    }

    fn restore_text_mode(&mut self) {
        (**self).restore_text_mode()
    }
}

/// The five test profiles offered at startup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Profile {
    Vga320x200,
    Ega640x350,
    Vesa640x400,
    Vesa640x480,
    Vesa800x600,
}

impl Profile {
    pub const ALL: [Profile; 5] = [
        Profile::Vga320x200,
        Profile::Ega640x350,
        Profile::Vesa640x400,
        Profile::Vesa640x480,
        Profile::Vesa800x600,
    ];

    /// Profile for a menu key ('1'..'5')
    pub fn from_key(key: u8) -> Option<Self> {
        match key {
            b'1' => Some(Profile::Vga320x200),
            b'2' => Some(Profile::Ega640x350),
            b'3' => Some(Profile::Vesa640x400),
            b'4' => Some(Profile::Vesa640x480),
            b'5' => Some(Profile::Vesa800x600),
            _ => None,
        }
    }

    pub fn key(self) -> u8 {
        match self {
            Profile::Vga320x200 => b'1',
            Profile::Ega640x350 => b'2',
            Profile::Vesa640x400 => b'3',
            Profile::Vesa640x480 => b'4',
            Profile::Vesa800x600 => b'5',
        }
    }

    pub fn mode(self) -> ModeId {
        match self {
            Profile::Vga320x200 => ModeId::VGA_320X200X256,
            Profile::Ega640x350 => ModeId::EGA_640X350X16,
            Profile::Vesa640x400 => ModeId::VESA_640X400X256,
            Profile::Vesa640x480 => ModeId::VESA_640X480X256,
            Profile::Vesa800x600 => ModeId::VESA_800X600X256,
        }
    }

    /// Resolution label, e.g. "640x480"
    pub fn label(self) -> &'static str {
        match self {
            Profile::Vga320x200 => "320x200",
            Profile::Ega640x350 => "640x350",
            Profile::Vesa640x400 => "640x400",
            Profile::Vesa640x480 => "640x480",
            Profile::Vesa800x600 => "800x600",
        }
    }

    /// Startup menu line
    pub fn menu_line(self) -> String {
        let (depth, family) = match self {
            Profile::Vga320x200 => ("256", "VGA "),
            Profile::Ega640x350 => ("16 ", "EGA "),
            _ => ("256", "VESA"),
        };
        format!(
            "[{}] {}x{} ({} {})",
            self.key() as char,
            self.label(),
            depth,
            family,
            self.mode()
        )
    }

    /// Built-in layout of the standard VGA / EGA modes
    pub fn fixed_profile(self) -> Option<DisplayProfile> {
        match self {
            Profile::Vga320x200 => Some(DisplayProfile {
                width: 320,
                height: 200,
                bits_per_pixel: 8,
                memory_model: MemoryModel::Linear { stride: 320 },
            }),
            Profile::Ega640x350 => Some(DisplayProfile {
                width: 640,
                height: 350,
                bits_per_pixel: 4,
                memory_model: MemoryModel::Planar4bpp { stride: 80 },
            }),
            _ => None,
        }
    }

    /// Uses the 256-colour DAC path
    pub fn uses_dac_palette(self) -> bool {
        self != Profile::Ega640x350
    }
}
