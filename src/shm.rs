//! Anonymous POSIX shared memory for compositor buffers.
//!
//! Objects are created under a randomized name and unlinked straight away, so
//! the only handle left is the returned descriptor.

use std::os::fd::OwnedFd;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::libc;
use nix::sys::mman::{shm_open, shm_unlink};
use nix::sys::stat::Mode;
use nix::unistd::ftruncate;
use thiserror::Error;

/// Upper bound on name collisions before giving up.
pub const MAX_ATTEMPTS: usize = 100;

const NAME_PREFIX: &str = "/wayearth-";

/// Errors raised while allocating a shared memory object.
#[derive(Debug, Error)]
pub enum ShmError {
    #[error("no free shared memory name after {attempts} attempts")]
    Exhausted { attempts: usize },

    #[error("shm_open failed: {0}")]
    Open(Errno),

    #[error("failed to resize shared memory object: {0}")]
    Resize(Errno),

    #[error("failed to unlink shared memory object {name}: {source}")]
    Unlink { name: String, source: Errno },
}

/// Creates an unlinked shared memory object of exactly `size` bytes.
pub fn allocate(size: usize) -> Result<OwnedFd, ShmError> {
    let (fd, _name) = create_unlinked_with(random_name)?;
    resize(fd, size)
}

fn resize(fd: OwnedFd, size: usize) -> Result<OwnedFd, ShmError> {
    let len = libc::off_t::try_from(size).map_err(|_| ShmError::Resize(Errno::EOVERFLOW))?;
    loop {
        match ftruncate(&fd, len) {
            Ok(()) => return Ok(fd),
            Err(Errno::EINTR) => continue,
            // `fd` is closed when it drops here.
            Err(err) => return Err(ShmError::Resize(err)),
        }
    }
}

/// Opens a fresh object using names from `next_name`, retrying on collisions.
///
/// Returns the descriptor together with the (already unlinked) name it was
/// created under.
fn create_unlinked_with(
    next_name: impl FnMut() -> String,
) -> Result<(OwnedFd, String), ShmError> {
    create_with(next_name, |name| shm_unlink(name))
}

fn create_with(
    mut next_name: impl FnMut() -> String,
    unlink: impl Fn(&str) -> nix::Result<()>,
) -> Result<(OwnedFd, String), ShmError> {
    for _ in 0..MAX_ATTEMPTS {
        let name = next_name();
        match shm_open(
            name.as_str(),
            OFlag::O_RDWR | OFlag::O_CREAT | OFlag::O_EXCL,
            Mode::S_IRUSR | Mode::S_IWUSR,
        ) {
            Ok(fd) => {
                // A name left behind would outlive the process; drop `fd` and fail.
                return match unlink(name.as_str()) {
                    Ok(()) => Ok((fd, name)),
                    Err(source) => Err(ShmError::Unlink { name, source }),
                };
            }
            Err(Errno::EEXIST) => continue,
            Err(err) => return Err(ShmError::Open(err)),
        }
    }

    Err(ShmError::Exhausted {
        attempts: MAX_ATTEMPTS,
    })
}

fn random_name() -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as u64)
        .unwrap_or_default();
    let count = COUNTER.fetch_add(1, Ordering::Relaxed);
    let mut bits = nanos
        ^ (u64::from(std::process::id()) << 32)
        ^ count.wrapping_mul(0x9E37_79B9_7F4A_7C15);

    let mut name = String::with_capacity(NAME_PREFIX.len() + 6);
    name.push_str(NAME_PREFIX);
    for _ in 0..6 {
        // 'A'..='P' for the low nibble, shifted to lowercase by bit 4.
        let offset = (bits & 15) + (bits & 16) * 2;
        name.push(char::from(b'A' + offset as u8));
        bits >>= 5;
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::fs::File;
    use std::io::{Read, Seek, SeekFrom, Write};

    #[test]
    fn allocate_yields_object_of_requested_size() {
        let fd = allocate(8192).expect("allocate shm");
        let file = File::from(fd);
        assert_eq!(file.metadata().unwrap().len(), 8192);
    }

    #[test]
    fn allocated_object_is_readable_and_writable() {
        let fd = allocate(64).expect("allocate shm");
        let mut file = File::from(fd);
        file.write_all(b"globe").unwrap();
        file.seek(SeekFrom::Start(0)).unwrap();
        let mut contents = [0u8; 5];
        file.read_exact(&mut contents).unwrap();
        assert_eq!(&contents, b"globe");
    }

    #[test]
    fn created_object_is_not_reachable_by_name() {
        let (_fd, name) = create_unlinked_with(random_name).expect("create shm");
        let reopened = shm_open(name.as_str(), OFlag::O_RDWR, Mode::empty());
        assert_eq!(reopened.err(), Some(Errno::ENOENT));
    }

    #[test]
    fn failed_unlink_is_reported() {
        let name = format!("{NAME_PREFIX}unlink-{}", std::process::id());
        let result = create_with(|| name.clone(), |_| Err(Errno::EACCES));
        shm_unlink(name.as_str()).unwrap();

        match result {
            Err(ShmError::Unlink { name: reported, source }) => {
                assert_eq!(reported, name);
                assert_eq!(source, Errno::EACCES);
            }
            other => panic!("expected an unlink error, got {other:?}"),
        }
    }

    #[test]
    fn persistent_collision_gives_up_after_bounded_attempts() {
        let taken = format!("{NAME_PREFIX}collide-{}", std::process::id());
        let _holder = shm_open(
            taken.as_str(),
            OFlag::O_RDWR | OFlag::O_CREAT | OFlag::O_EXCL,
            Mode::S_IRUSR | Mode::S_IWUSR,
        )
        .expect("create colliding object");

        let mut calls = 0;
        let result = create_unlinked_with(|| {
            calls += 1;
            taken.clone()
        });
        shm_unlink(taken.as_str()).unwrap();

        assert!(matches!(
            result,
            Err(ShmError::Exhausted {
                attempts: MAX_ATTEMPTS
            })
        ));
        assert_eq!(calls, MAX_ATTEMPTS);
    }

    #[test]
    fn names_are_well_formed_and_distinct_in_rapid_succession() {
        let names: Vec<String> = (0..64).map(|_| random_name()).collect();
        for name in &names {
            let suffix = name.strip_prefix(NAME_PREFIX).expect("prefix");
            assert_eq!(suffix.len(), 6);
            assert!(
                suffix
                    .chars()
                    .all(|c| ('A'..='P').contains(&c) || ('a'..='p').contains(&c))
            );
        }
        let unique: HashSet<&String> = names.iter().collect();
        assert_eq!(unique.len(), names.len());
    }
}
