use crate::synchronizer::SyncedSignal;

/// Serial clock edge pulse, derived from the two synchronizer stages.
///
/// High when the older stage holds a high sample and the newer one a low
/// sample. Each SCLK pulse produces exactly one such tick once it has crossed
/// the synchronizer, so the deserializer samples the data bit that was held
/// through the high phase.
pub const fn clock_rising(clock: &SyncedSignal) -> bool {
    clock.level() && !clock.stage1()
}
