//! Forward-looking maintenance recommendations derived from a cleanup
//! session's execution counts.

use im::Vector;
use serde::{Deserialize, Serialize};

use super::ExecutionCounts;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum RecommendationType {
    Process,
    Testing,
    Performance,
    Organization,
}

impl std::fmt::Display for RecommendationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        static DISPLAY_STRINGS: &[(RecommendationType, &str)] = &[
            (RecommendationType::Process, "process"),
            (RecommendationType::Testing, "testing"),
            (RecommendationType::Performance, "performance"),
            (RecommendationType::Organization, "organization"),
        ];

        let display_str = DISPLAY_STRINGS
            .iter()
            .find(|(t, _)| t == self)
            .map(|(_, s)| *s)
            .unwrap_or("unknown");

        write!(f, "{display_str}")
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MaintenanceRecommendation {
    pub recommendation_type: RecommendationType,
    pub priority: Priority,
    pub title: String,
    pub description: String,
    pub action_items: Vec<String>,
    /// Rough effort in hours
    pub effort_estimate_hours: u32,
}

impl MaintenanceRecommendation {
    pub fn priority_level(&self) -> u8 {
        match self.priority {
            Priority::Low => 1,
            Priority::Medium => 2,
            Priority::High => 3,
            Priority::Critical => 4,
        }
    }

    pub fn is_urgent(&self) -> bool {
        self.priority >= Priority::High
    }
}

#[derive(Default)]
pub struct MaintenanceRecommendationEngine;

impl MaintenanceRecommendationEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn recommend(&self, counts: &ExecutionCounts) -> Vector<MaintenanceRecommendation> {
        let mut recommendations = Vector::new();

        if counts.failed_operations > 0 {
            recommendations.push_back(MaintenanceRecommendation {
                recommendation_type: RecommendationType::Process,
                priority: Priority::Critical,
                title: "Resolve failed cleanup operations".to_string(),
                description: format!(
                    "{} operations failed during execution and left their files untouched. \
                     Re-run after addressing the per-file errors.",
                    counts.failed_operations
                ),
                action_items: vec![
                    "Read the error list in the cleanup report".to_string(),
                    "Fix parse errors in the affected files".to_string(),
                    "Re-run cleanup on the failed subset".to_string(),
                ],
                effort_estimate_hours: 2,
            });
        }

        if counts.methods_removed + counts.imports_removed > 30 {
            recommendations.push_back(MaintenanceRecommendation {
                recommendation_type: RecommendationType::Testing,
                priority: Priority::High,
                title: "Strengthen regression coverage".to_string(),
                description: "A large amount of dead code accumulated before this cleanup, \
                              which usually means feature areas without tests."
                    .to_string(),
                action_items: vec![
                    "Add feature tests for controllers that lost the most methods".to_string(),
                    "Wire the test command into CI so dead code surfaces earlier".to_string(),
                ],
                effort_estimate_hours: 8,
            });
        }

        if counts.duplicates_refactored > 0 || counts.components_created > 0 {
            recommendations.push_back(MaintenanceRecommendation {
                recommendation_type: RecommendationType::Organization,
                priority: Priority::Medium,
                title: "Adopt the extracted shared artifacts".to_string(),
                description: format!(
                    "{} duplicate groups were consolidated. New code should reference the \
                     shared components instead of copying markup.",
                    counts.duplicates_refactored
                ),
                action_items: vec![
                    "Document the new components directory for the team".to_string(),
                    "Review open branches for copies of the extracted fragments".to_string(),
                ],
                effort_estimate_hours: 3,
            });
        }

        if counts.files_deleted > 10 {
            recommendations.push_back(MaintenanceRecommendation {
                recommendation_type: RecommendationType::Performance,
                priority: Priority::Low,
                title: "Rebuild asset manifests".to_string(),
                description: "Many orphaned assets were removed; compiled manifests and CDN \
                              caches may still list them."
                    .to_string(),
                action_items: vec![
                    "Re-run the asset build".to_string(),
                    "Invalidate CDN entries for removed paths".to_string(),
                ],
                effort_estimate_hours: 1,
            });
        }

        if counts.total_removals() > 0 && counts.failed_operations == 0 {
            recommendations.push_back(MaintenanceRecommendation {
                recommendation_type: RecommendationType::Process,
                priority: Priority::Low,
                title: "Schedule recurring cleanup".to_string(),
                description: "Dead code was found and removed cleanly; a periodic dry-run scan \
                              keeps the backlog small."
                    .to_string(),
                action_items: vec!["Add a monthly dry-run scan to the team calendar".to_string()],
                effort_estimate_hours: 1,
            });
        }

        recommendations
    }
}
