//! Pruning applied to every phase result of the phased multiply

use crate::dist::SpParMat;
use crate::error::Result;

/// Bounds the nonzeros of a layer matrix in place
pub trait PrunePolicy<T> {
    fn prune(&self, layer: &mut SpParMat<T>) -> Result<()>;
}

/// Keeps every entry
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPrune;

impl<T> PrunePolicy<T> for NoPrune {
    fn prune(&self, _layer: &mut SpParMat<T>) -> Result<()> {
        Ok(())
    }
}

/// Drops entries whose value is below `threshold`
#[derive(Debug, Clone, Copy)]
pub struct HardThreshold<T> {
    pub threshold: T,
}

impl<T> HardThreshold<T> {
    pub fn new(threshold: T) -> Self {
        Self { threshold }
    }
}

impl<T> PrunePolicy<T> for HardThreshold<T>
where
    T: crate::comm::Payload + PartialOrd + Sync,
{
    fn prune(&self, layer: &mut SpParMat<T>) -> Result<()> {
        let threshold = self.threshold;
        layer.local_mut().retain(|v| *v >= threshold);
        Ok(())
    }
}
