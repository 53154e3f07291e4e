pub mod assessments;
pub mod cooperation_users;
pub mod cooperations;
pub mod digitalisation_gaps;
pub mod digitalisation_levels;
pub mod dimension_assessments;
pub mod dimensions;
pub mod offline_repository;
pub mod recommendations;

#[cfg(test)]
pub(crate) mod test_support;

pub use assessments::AssessmentRepository;
pub use cooperation_users::CooperationUserRepository;
pub use cooperations::CooperationRepository;
pub use digitalisation_gaps::DigitalisationGapRepository;
pub use digitalisation_levels::DigitalisationLevelRepository;
pub use dimension_assessments::DimensionAssessmentRepository;
pub use dimensions::DimensionRepository;
pub use offline_repository::{OfflineRepository, RepositoryContext};
pub use recommendations::RecommendationRepository;

/// One repository per entity kind over a shared context.
#[derive(Clone)]
pub struct Repositories {
    pub assessments: AssessmentRepository,
    pub dimensions: DimensionRepository,
    pub recommendations: RecommendationRepository,
    pub digitalisation_gaps: DigitalisationGapRepository,
    pub digitalisation_levels: DigitalisationLevelRepository,
    pub cooperations: CooperationRepository,
    pub cooperation_users: CooperationUserRepository,
    pub dimension_assessments: DimensionAssessmentRepository,
}

impl Repositories {
    pub fn new(ctx: RepositoryContext) -> Self {
        Self {
            assessments: OfflineRepository::new(ctx.clone()),
            dimensions: OfflineRepository::new(ctx.clone()),
            recommendations: OfflineRepository::new(ctx.clone()),
            digitalisation_gaps: OfflineRepository::new(ctx.clone()),
            digitalisation_levels: OfflineRepository::new(ctx.clone()),
            cooperations: OfflineRepository::new(ctx.clone()),
            cooperation_users: OfflineRepository::new(ctx.clone()),
            dimension_assessments: OfflineRepository::new(ctx),
        }
    }
}
