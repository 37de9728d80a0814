//! Nether-Anim: skeletal animation track compression for Nethercore
//!
//! Packs per-bone translation and rotation curves into one compact byte
//! stream per sequence, and samples interpolated bone poses back out of it at
//! arbitrary playback times.
//!
//! **Sampling never allocates or validates.** A `CompressedSequence` is either
//! produced by the encoder or checked once by `CompressedSequence::from_bytes`;
//! after that the decoders index straight into the stream.
//!
//! # Pipeline
//!
//! ```text
//! RawAnimation (one key per frame)
//!   -> key reduction (bitwise only, trivial keys, every other key, linear keys)
//!   -> BoneTrack (retained keys + times)
//!   -> encode_tracks (rotation format, key encoding)
//!   -> CompressedSequence (track offset table + byte stream)
//!   -> sample_bone_atom / sample_pose at playback time
//! ```
//!
//! # Formats
//!
//! | Rotation format | Bytes per key | Notes |
//! |-----------------|---------------|-------|
//! | Uncompressed | 16 | x, y, z, w as f32 |
//! | Float96NoW | 12 | w rebuilt from unit length |
//! | Fixed48NoW | 6 | 3 x u16 over [-1, 1] |
//! | IntervalFixed32NoW | 4 | 11/11/10 bits over the track's min/range |
//! | Fixed32NoW | 4 | 11/11/10 bits over [-1, 1] |
//! | Float32NoW | 4 | 11/11/10 bit small floats |
//! | Fixed48Max | 6 | decode only |
//!
//! Keys are either evenly spaced (`ConstantRate`) or carry a frame table
//! (`VariableRate`).
//!
//! # Usage
//!
//! ```
//! use glam::{Quat, Vec3};
//! use nether_anim::{
//!     BoneAtom, CompressionSettings, RawAnimation, RawTrack, Skeleton, SkeletonBone, compress,
//! };
//!
//! let skeleton = Skeleton::new(vec![SkeletonBone {
//!     name: "root".into(),
//!     parent: None,
//!     reference: BoneAtom::IDENTITY,
//! }]);
//! let animation = RawAnimation {
//!     name: "slide".into(),
//!     num_frames: 3,
//!     sequence_length: 1.0,
//!     tracks: vec![RawTrack {
//!         positions: vec![Vec3::ZERO, Vec3::X, Vec3::X * 2.0],
//!         rotations: vec![Quat::IDENTITY],
//!     }],
//!     ..Default::default()
//! };
//!
//! let compressed = compress(&animation, &skeleton, &CompressionSettings::default()).unwrap();
//! let pose = compressed.sample_pose(&skeleton, 0.25, false);
//! assert!(pose[0].translation.abs_diff_eq(Vec3::new(0.5, 0.0, 0.0), 1e-5));
//! ```

pub mod codec;
pub mod compress;
pub mod error;
pub mod formats;
pub mod layout;
pub mod math;
pub mod reduce;
pub mod sampler;
pub mod skeleton;
pub mod tracks;

pub use compress::{
    BatchSummary, CompressedAnimation, CompressionCandidate, CompressionSettings, ErrorStats,
    ReductionScheme, compress, compress_batch,
};
pub use error::{AnimError, Result};
pub use formats::{KeyEncoding, RotationFormat, SequenceFormat, TranslationFormat};
pub use layout::{CompressedSequence, SequenceHeader, SequenceStats, TrackOffsets, encode_tracks};
pub use math::BoneAtom;
pub use reduce::LinearKeySettings;
pub use sampler::{BoneTrackPair, sample_bone_atom, sample_pose, sample_skeleton_pose};
pub use skeleton::{BoneHierarchy, Skeleton, SkeletonBone};
pub use tracks::{BoneTrack, RawAnimation, RawTrack};
