pub mod device;
pub mod file;
pub mod level;
pub mod monitor;
pub mod replay;

pub use device::{AudioQuality, CaptureDevice, QualityPreset};
pub use file::AudioFile;
pub use level::{AmplitudeSample, LevelBand, Rgb};
pub use monitor::{AmplitudeMonitor, SAMPLE_PERIOD};
pub use replay::ReplayDevice;
