//! Owns the single shared-memory pixel buffer presented on the surface.

use std::os::fd::{AsFd, BorrowedFd, OwnedFd};

use log::{debug, info};
use memmap2::{MmapMut, MmapOptions};
use wayland_client::{
    QueueHandle,
    protocol::{wl_buffer::WlBuffer, wl_shm, wl_shm::WlShm},
};

use super::state::WaylandState;
use crate::backend::BackendError;
use crate::render::Geometry;
use crate::shm;

/// Backing-store capacity as a multiple of one frame.
const PROVISION_FACTOR: usize = 2;

/// Turns a shared-memory descriptor into a compositor-visible buffer.
pub(super) trait PoolFactory {
    type Buffer;

    /// Creates a buffer of `geometry` at offset 0 of a `pool_size`-byte pool.
    fn create_buffer(
        &mut self,
        fd: BorrowedFd<'_>,
        pool_size: usize,
        geometry: Geometry,
    ) -> Result<Self::Buffer, BackendError>;

    fn destroy_buffer(&mut self, buffer: Self::Buffer);
}

/// Descriptor and mapping of one shared-memory object.
struct BackingStore {
    _fd: OwnedFd,
    map: MmapMut,
}

/// A mapped ARGB8888 buffer and the protocol object that exposes it.
pub(super) struct PixelBuffer<B> {
    store: BackingStore,
    handle: B,
    geometry: Geometry,
}

impl<B> PixelBuffer<B> {
    pub(super) fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub(super) fn handle(&self) -> &B {
        &self.handle
    }

    /// The visible `width * height` pixels; the rest of the store is unused.
    pub(super) fn pixels_mut(&mut self) -> &mut [u8] {
        let len = self.geometry.frame_len();
        &mut self.store.map[..len]
    }

    /// Total mapped bytes.
    pub(super) fn capacity(&self) -> usize {
        self.store.map.len()
    }
}

/// Keeps at most one [`PixelBuffer`] alive and rebuilds it on resize.
pub(super) struct BufferManager<F: PoolFactory> {
    factory: F,
    current: Option<PixelBuffer<F::Buffer>>,
}

impl<F: PoolFactory> BufferManager<F> {
    pub(super) fn new(factory: F) -> Self {
        Self {
            factory,
            current: None,
        }
    }

    /// Replaces the current buffer with one sized for `geometry`.
    ///
    /// The old buffer is released before the new store is allocated.
    pub(super) fn reconfigure(&mut self, geometry: Geometry) -> Result<(), BackendError> {
        self.release();

        let size = PROVISION_FACTOR * geometry.frame_len();
        let fd = shm::allocate(size)?;
        // SAFETY: the descriptor refers to a fresh, already-unlinked shm object
        // of exactly `size` bytes that no other process can open by name. The
        // compositor only reads from it while we own the mapping.
        let map = unsafe { MmapOptions::new().len(size).map_mut(&fd) }.map_err(BackendError::Map)?;
        let handle = self.factory.create_buffer(fd.as_fd(), size, geometry)?;

        info!(
            "Allocated {} pixel buffer ({} bytes, stride {})",
            geometry,
            size,
            geometry.stride()
        );
        self.current = Some(PixelBuffer {
            store: BackingStore { _fd: fd, map },
            handle,
            geometry,
        });
        Ok(())
    }

    pub(super) fn current_mut(&mut self) -> Option<&mut PixelBuffer<F::Buffer>> {
        self.current.as_mut()
    }

    fn release(&mut self) {
        if let Some(old) = self.current.take() {
            debug!("Releasing {} pixel buffer", old.geometry);
            let PixelBuffer { store, handle, .. } = old;
            drop(store);
            self.factory.destroy_buffer(handle);
        }
    }
}

impl<F: PoolFactory> Drop for BufferManager<F> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Creates `wl_buffer`s through short-lived `wl_shm_pool`s.
pub(super) struct ShmPoolFactory {
    shm: WlShm,
    qh: QueueHandle<WaylandState>,
}

impl ShmPoolFactory {
    pub(super) fn new(shm: WlShm, qh: QueueHandle<WaylandState>) -> Self {
        Self { shm, qh }
    }
}

impl PoolFactory for ShmPoolFactory {
    type Buffer = WlBuffer;

    fn create_buffer(
        &mut self,
        fd: BorrowedFd<'_>,
        pool_size: usize,
        geometry: Geometry,
    ) -> Result<WlBuffer, BackendError> {
        let too_large = || BackendError::BufferTooLarge { size: pool_size };
        let size = i32::try_from(pool_size).map_err(|_| too_large())?;
        let width = i32::try_from(geometry.width).map_err(|_| too_large())?;
        let height = i32::try_from(geometry.height).map_err(|_| too_large())?;
        let stride = i32::try_from(geometry.stride()).map_err(|_| too_large())?;

        let pool = self.shm.create_pool(fd, size, &self.qh, ());
        let buffer = pool.create_buffer(
            0,
            width,
            height,
            stride,
            wl_shm::Format::Argb8888,
            &self.qh,
            (),
        );
        // The buffer keeps the pool's memory alive on the compositor side.
        pool.destroy();
        Ok(buffer)
    }

    fn destroy_buffer(&mut self, buffer: WlBuffer) {
        buffer.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::super::surface::GeometryTracker;
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Ledger {
        created: usize,
        live: usize,
        max_live: usize,
        pool_sizes: Vec<usize>,
    }

    struct CountingFactory(Rc<RefCell<Ledger>>);

    impl PoolFactory for CountingFactory {
        type Buffer = usize;

        fn create_buffer(
            &mut self,
            _fd: BorrowedFd<'_>,
            pool_size: usize,
            _geometry: Geometry,
        ) -> Result<usize, BackendError> {
            let mut ledger = self.0.borrow_mut();
            ledger.created += 1;
            ledger.live += 1;
            ledger.max_live = ledger.max_live.max(ledger.live);
            ledger.pool_sizes.push(pool_size);
            Ok(ledger.created)
        }

        fn destroy_buffer(&mut self, _buffer: usize) {
            self.0.borrow_mut().live -= 1;
        }
    }

    fn manager() -> (BufferManager<CountingFactory>, Rc<RefCell<Ledger>>) {
        let ledger = Rc::new(RefCell::new(Ledger::default()));
        (
            BufferManager::new(CountingFactory(Rc::clone(&ledger))),
            ledger,
        )
    }

    #[test]
    fn provisions_twice_the_frame() {
        let (mut buffers, ledger) = manager();
        buffers.reconfigure(Geometry::new(800, 600)).unwrap();

        let buffer = buffers.current_mut().unwrap();
        assert_eq!(buffer.capacity(), 2 * 600 * 800 * 4);
        assert_eq!(buffer.pixels_mut().len(), 600 * 800 * 4);
        assert_eq!(ledger.borrow().pool_sizes, vec![2 * 600 * 800 * 4]);
    }

    #[test]
    fn never_holds_two_buffers() {
        let (mut buffers, ledger) = manager();
        for (w, h) in [(800, 600), (1024, 600), (640, 480)] {
            buffers.reconfigure(Geometry::new(w, h)).unwrap();
        }

        let ledger = ledger.borrow();
        assert_eq!(ledger.created, 3);
        assert_eq!(ledger.live, 1);
        assert_eq!(ledger.max_live, 1);
    }

    #[test]
    fn only_accepted_geometry_changes_reallocate() {
        let (mut buffers, ledger) = manager();
        let mut tracker = GeometryTracker::default();
        for (w, h) in [(0, 0), (800, 600), (800, 600), (1024, 600)] {
            if let Some(geometry) = tracker.accept(w, h) {
                buffers.reconfigure(geometry).unwrap();
            }
        }

        assert_eq!(ledger.borrow().created, 2);
        assert_eq!(
            buffers.current_mut().unwrap().geometry(),
            Geometry::new(1024, 600)
        );
    }

    #[test]
    fn dropping_the_manager_destroys_the_buffer() {
        let (mut buffers, ledger) = manager();
        buffers.reconfigure(Geometry::new(16, 16)).unwrap();
        drop(buffers);

        assert_eq!(ledger.borrow().live, 0);
    }

    #[test]
    fn mapping_is_writable() {
        let (mut buffers, _ledger) = manager();
        buffers.reconfigure(Geometry::new(4, 4)).unwrap();

        let buffer = buffers.current_mut().unwrap();
        buffer.pixels_mut().fill(0xFF);
        assert!(buffer.pixels_mut().iter().all(|&b| b == 0xFF));
        assert_eq!(*buffer.handle(), 1);
    }
}
