use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Read;
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::{debug, info};

use crate::error::{Result, SourceError};
use crate::traits::ReadSource;

/// Parity checking mode of the serial line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Parity {
    None,
    Odd,
    #[default]
    Even,
}

impl FromStr for Parity {
    type Err = SourceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "n" => Ok(Self::None),
            "odd" | "o" => Ok(Self::Odd),
            "even" | "e" => Ok(Self::Even),
            other => Err(SourceError::InvalidSetting {
                name: "parity",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Parity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Odd => write!(f, "odd"),
            Self::Even => write!(f, "even"),
        }
    }
}

/// Line settings for the timing console's serial output.
///
/// Defaults match the console: 9600 baud, 8 data bits, 1 stop bit, even parity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerialSettings {
    pub baud_rate: u32,
    pub data_bits: u8,
    pub stop_bits: u8,
    pub parity: Parity,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            baud_rate: 9600,
            data_bits: 8,
            stop_bits: 1,
            parity: Parity::Even,
        }
    }
}

impl SerialSettings {
    /// Check the settings against what termios can express.
    pub fn validate(&self) -> Result<()> {
        baud_constant(self.baud_rate)?;
        data_bits_flag(self.data_bits)?;
        if !matches!(self.stop_bits, 1 | 2) {
            return Err(SourceError::InvalidSetting {
                name: "stop_bits",
                value: self.stop_bits.to_string(),
            });
        }
        Ok(())
    }
}

/// A serial device opened in raw, blocking mode.
pub struct SerialPort {
    file: File,
    path: PathBuf,
}

impl SerialPort {
    /// Open and configure a serial device.
    pub fn open(path: impl AsRef<Path>, settings: &SerialSettings) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        settings.validate()?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY)
            .open(&path)
            .map_err(|source| SourceError::Open {
                path: path.clone(),
                source,
            })?;

        configure(&file, settings).map_err(|source| SourceError::Configure {
            path: path.clone(),
            source,
        })?;

        info!(
            ?path,
            baud = settings.baud_rate,
            data_bits = settings.data_bits,
            stop_bits = settings.stop_bits,
            parity = %settings.parity,
            "opened serial port"
        );

        Ok(Self { file, path })
    }

    /// Open a device and wrap it as a byte source.
    pub fn open_source(path: impl AsRef<Path>, settings: &SerialSettings) -> Result<ReadSource<Self>> {
        Self::open(path, settings).map(ReadSource::new)
    }

    /// Device path this port was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Read for SerialPort {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.file.read(buf)
    }
}

impl fmt::Debug for SerialPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialPort").field("path", &self.path).finish()
    }
}

fn configure(file: &File, settings: &SerialSettings) -> std::io::Result<()> {
    let fd = file.as_raw_fd();
    let speed = baud_constant(settings.baud_rate).map_err(std::io::Error::other)?;
    let size = data_bits_flag(settings.data_bits).map_err(std::io::Error::other)?;

    // SAFETY: an all-zero `termios` is a valid value for tcgetattr to overwrite.
    let mut tty: libc::termios = unsafe { std::mem::zeroed() };

    // SAFETY: `fd` is an open descriptor owned by `file` and `tty` is a valid
    // writable termios struct.
    if unsafe { libc::tcgetattr(fd, &mut tty) } != 0 {
        return Err(std::io::Error::last_os_error());
    }

    // SAFETY: `tty` was initialized by tcgetattr above.
    unsafe { libc::cfmakeraw(&mut tty) };

    tty.c_cflag &= !(libc::CSIZE | libc::CSTOPB | libc::PARENB | libc::PARODD);
    tty.c_cflag |= size | libc::CLOCAL | libc::CREAD;
    if settings.stop_bits == 2 {
        tty.c_cflag |= libc::CSTOPB;
    }
    match settings.parity {
        Parity::None => {}
        Parity::Even => tty.c_cflag |= libc::PARENB,
        Parity::Odd => tty.c_cflag |= libc::PARENB | libc::PARODD,
    }

    // Block until at least one byte is available.
    tty.c_cc[libc::VMIN] = 1;
    tty.c_cc[libc::VTIME] = 0;

    // SAFETY: `tty` is a valid termios struct and `speed` a termios speed constant.
    let rc = unsafe {
        libc::cfsetispeed(&mut tty, speed) | libc::cfsetospeed(&mut tty, speed)
    };
    if rc != 0 {
        return Err(std::io::Error::last_os_error());
    }

    // SAFETY: `fd` is open and `tty` is fully initialized.
    if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &tty) } != 0 {
        return Err(std::io::Error::last_os_error());
    }

    debug!(fd, "applied termios settings");
    Ok(())
}

fn baud_constant(baud: u32) -> Result<libc::speed_t> {
    let speed = match baud {
        1200 => libc::B1200,
        2400 => libc::B2400,
        4800 => libc::B4800,
        9600 => libc::B9600,
        19200 => libc::B19200,
        38400 => libc::B38400,
        57600 => libc::B57600,
        115200 => libc::B115200,
        other => {
            return Err(SourceError::InvalidSetting {
                name: "baud_rate",
                value: other.to_string(),
            })
        }
    };
    Ok(speed)
}

fn data_bits_flag(bits: u8) -> Result<libc::tcflag_t> {
    let flag = match bits {
        5 => libc::CS5,
        6 => libc::CS6,
        7 => libc::CS7,
        8 => libc::CS8,
        other => {
            return Err(SourceError::InvalidSetting {
                name: "data_bits",
                value: other.to_string(),
            })
        }
    };
    Ok(flag)
}
