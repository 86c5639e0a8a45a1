//! Typed generational handles.
//!
//! A handle is a 64-bit value carrying a 32-bit slot index in its low half and
//! a 32-bit generation in its high half. The generation is bumped every time a
//! slot is reused, so a handle kept past the destruction of its resource
//! reliably fails to resolve instead of aliasing the new occupant.
//!
//! Handles additionally carry a compile-time resource kind, so a
//! `Handle<marker::Buffer>` cannot be passed where a `Handle<marker::Image>`
//! is expected. The marker is zero-sized; a handle is always 8 bytes.

use std::{fmt, hash::Hash, hash::Hasher, marker::PhantomData};

/// Number of bits used for the slot index part of a key.
pub const KEY_INDEX_BITS: u64 = 32;
const KEY_INDEX_MASK: u64 = 0x0000_0000_FFFF_FFFF;

/// Untyped generational key into a [`SlotMap`](crate::slot_map::SlotMap).
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct SlotKey {
    pub index: u32,
    pub generation: u32,
}

impl SlotKey {
    /// The key that matches no slot.
    pub const NULL: SlotKey = SlotKey {
        index: u32::MAX,
        generation: u32::MAX,
    };

    pub const fn new(index: u32, generation: u32) -> SlotKey {
        SlotKey { index, generation }
    }

    /// Packs the key into its 64-bit wire form (generation high, index low).
    pub const fn pack(self) -> u64 {
        ((self.generation as u64) << KEY_INDEX_BITS) | (self.index as u64 & KEY_INDEX_MASK)
    }

    /// Reconstructs a key from its packed form.
    pub const fn unpack(raw: u64) -> SlotKey {
        SlotKey {
            index: (raw & KEY_INDEX_MASK) as u32,
            generation: (raw >> KEY_INDEX_BITS) as u32,
        }
    }

    pub const fn is_null(self) -> bool {
        self.index == u32::MAX && self.generation == u32::MAX
    }
}

impl Default for SlotKey {
    fn default() -> Self {
        SlotKey::NULL
    }
}

impl fmt::Debug for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_null() {
            write!(f, "<null>")
        } else {
            write!(f, "{}v{}", self.index, self.generation)
        }
    }
}

/// Resource kind tags carried by [`Handle`].
pub mod marker {
    macro_rules! markers {
        ($($(#[$m:meta])* $name:ident,)*) => {
            $(
                $(#[$m])*
                #[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
                pub enum $name {}
            )*
        };
    }

    markers! {
        Buffer,
        Image,
        Sampler,
        Fence,
        Semaphore,
        CommandList,
        RenderSurface,
        Pipeline,
        DescriptorSet,
        /// Tag for passes registered with a render graph compiler.
        GraphPass,
    }
}

/// A typed handle to a resource registered with a device or graph.
#[repr(transparent)]
pub struct Handle<M> {
    key: SlotKey,
    _marker: PhantomData<M>,
}

pub type BufferHandle = Handle<marker::Buffer>;
pub type ImageHandle = Handle<marker::Image>;
pub type SamplerHandle = Handle<marker::Sampler>;
pub type FenceHandle = Handle<marker::Fence>;
pub type SemaphoreHandle = Handle<marker::Semaphore>;
pub type CommandListHandle = Handle<marker::CommandList>;
pub type RenderSurfaceHandle = Handle<marker::RenderSurface>;
pub type PipelineHandle = Handle<marker::Pipeline>;
pub type DescriptorSetHandle = Handle<marker::DescriptorSet>;
pub type GraphPassHandle = Handle<marker::GraphPass>;

impl<M> Handle<M> {
    /// The null handle. Never resolves to a live resource.
    pub const NULL: Handle<M> = Handle {
        key: SlotKey::NULL,
        _marker: PhantomData,
    };

    pub(crate) const fn from_key(key: SlotKey) -> Handle<M> {
        Handle {
            key,
            _marker: PhantomData,
        }
    }

    pub(crate) const fn key(self) -> SlotKey {
        self.key
    }

    /// Slot index part of the handle.
    pub const fn id(self) -> u32 {
        self.key.index
    }

    /// Generation part of the handle.
    pub const fn generation(self) -> u32 {
        self.key.generation
    }

    pub const fn is_null(self) -> bool {
        self.key.is_null()
    }

    /// Packed 64-bit form, usable as a map key or for logging.
    pub const fn pack(self) -> u64 {
        self.key.pack()
    }

    pub const fn unpack(raw: u64) -> Handle<M> {
        Handle::from_key(SlotKey::unpack(raw))
    }
}

// Manual impls: `derive` would bound them on `M`, which is only a tag.
impl<M> Copy for Handle<M> {}

impl<M> Clone for Handle<M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M> PartialEq for Handle<M> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<M> Eq for Handle<M> {}

impl<M> Hash for Handle<M> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state)
    }
}

impl<M> Default for Handle<M> {
    fn default() -> Self {
        Handle::NULL
    }
}

impl<M> fmt::Debug for Handle<M> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}({:?})", std::any::type_name::<M>().rsplit("::").next().unwrap_or("?"), self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_round_trip() {
        let k = SlotKey::new(17, 4);
        assert_eq!(SlotKey::unpack(k.pack()), k);
        assert_eq!(k.pack(), (4u64 << 32) | 17);
    }

    #[test]
    fn null_is_all_ones() {
        assert_eq!(SlotKey::NULL.pack(), u64::MAX);
        assert!(BufferHandle::NULL.is_null());
        assert_eq!(BufferHandle::NULL, BufferHandle::default());
    }

    #[test]
    fn equality_requires_both_parts() {
        let a = ImageHandle::from_key(SlotKey::new(3, 1));
        let b = ImageHandle::from_key(SlotKey::new(3, 2));
        let c = ImageHandle::from_key(SlotKey::new(4, 1));
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, ImageHandle::from_key(SlotKey::new(3, 1)));
    }
}
