//! Resolution of generator records into their canonical form.
use crate::config::Configuration;
use crate::generator::{GeneratorDescriptor, RawRecord, RecordError, ResolvedGenerator};
use crate::reserve::{FuelCategory, ReserveAllocator};
use crate::technology::TechnologyClassifier;
use crate::units::UnitConverter;
use log::debug;

/// Runs each generator through classification and reserve allocation
#[derive(Clone, Copy)]
pub struct Resolver<'a> {
    config: &'a Configuration,
    units: UnitConverter<'a>,
    classifier: TechnologyClassifier<'a>,
    allocator: ReserveAllocator<'a>,
}

impl<'a> Resolver<'a> {
    /// Create a new [`Resolver`] reading from `config`
    pub fn new(config: &'a Configuration) -> Self {
        Self {
            config,
            units: UnitConverter::new(config),
            classifier: TechnologyClassifier::new(config),
            allocator: ReserveAllocator::new(config),
        }
    }

    /// Classify `descriptor` and compute its reserve contributions
    pub fn resolve(
        &self,
        descriptor: GeneratorDescriptor,
    ) -> Result<ResolvedGenerator, RecordError> {
        let model_class = self.classifier.classify(&descriptor)?;
        let fuel_category = FuelCategory::for_descriptor(self.config, &descriptor);
        let reserves = self
            .allocator
            .allocate(&descriptor, &model_class, fuel_category)?;
        debug!(
            "Generator in region {} ({} MW) resolved to {model_class}",
            descriptor.region, descriptor.capacity
        );

        Ok(ResolvedGenerator {
            descriptor,
            model_class,
            fuel_category,
            reserves,
        })
    }

    /// Read a descriptor from a normalised record, then resolve it
    pub fn resolve_record(&self, record: &RawRecord) -> Result<ResolvedGenerator, RecordError> {
        let descriptor = GeneratorDescriptor::from_record(record, &self.units)?;
        self.resolve(descriptor)
    }
}
