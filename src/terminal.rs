use std::io;
use std::os::unix::io::RawFd;

/// Puts a terminal into raw mode and restores the saved settings on drop.
///
/// Raw mode disables line buffering, local echo and signal generation, so
/// Ctrl-C arrives as an ordinary `0x03` byte.
pub struct RawMode {
    fd: RawFd,
    original: libc::termios,
}

impl RawMode {
    pub fn enable(fd: RawFd) -> io::Result<Self> {
        let mut termios = unsafe { std::mem::zeroed::<libc::termios>() };
        if unsafe { libc::tcgetattr(fd, &mut termios) } != 0 {
            return Err(io::Error::last_os_error());
        }
        let original = termios;

        unsafe { libc::cfmakeraw(&mut termios) };
        if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &termios) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(RawMode { fd, original })
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        if unsafe { libc::tcsetattr(self.fd, libc::TCSANOW, &self.original) } != 0 {
            log::warn!(
                "failed to restore terminal mode: {}",
                io::Error::last_os_error()
            );
        }
    }
}
