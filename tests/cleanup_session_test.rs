//! End-to-end cleanup session against a git-controlled fixture tree:
//! scan, plan, execute, validate, report.

use git2::{IndexAddOption, Repository, Signature};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

use codesweep::config::CleanupConfig;
use codesweep::pipeline::CleanupPipeline;

const INVOICE_SERVICE: &str = "\
<?php

namespace App\\Services;

use App\\Models\\Invoice;
use App\\Support\\LegacyFormatter;

class InvoiceService
{
    public function total(Invoice $invoice)
    {
        $draft = 0;
        $subtotal = $invoice->lines->sum('amount');
        return $subtotal * 1.2;
    }

    private function legacyTotal()
    {
        return 2;
    }
}
";

const PROMO_BANNER: &str = "\
<div class=\"promo-banner highlight\">
    <h2>{{ $title }}</h2>
    <p>{{ $message }}</p>
    <a href=\"/promo\">See more</a>
</div>
";

fn commit_all(root: &Path, message: &str) {
    let repo = Repository::open(root).unwrap();
    let mut index = repo.index().unwrap();
    index
        .add_all(["*"].iter(), IndexAddOption::DEFAULT, None)
        .unwrap();
    index.write().unwrap();
    let tree_id = index.write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();
    let sig = Signature::now("fixture", "fixture@localhost").unwrap();
    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<&git2::Commit> = parent.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .unwrap();
}

fn build_fixture() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    Repository::init(root).unwrap();

    fs::create_dir_all(root.join("app/Services")).unwrap();
    fs::create_dir_all(root.join("resources/views")).unwrap();
    fs::create_dir_all(root.join("public/images")).unwrap();

    fs::write(root.join("app/Services/InvoiceService.php"), INVOICE_SERVICE).unwrap();
    for view in ["home", "shop", "checkout"] {
        fs::write(
            root.join(format!("resources/views/{view}.blade.php")),
            PROMO_BANNER,
        )
        .unwrap();
    }
    fs::write(root.join("public/images/old_logo.png"), [0x89u8, 0x50, 0x4e]).unwrap();

    commit_all(root, "initial tree");
    dir
}

#[test]
fn full_session_removes_dead_code_and_extracts_components() {
    let dir = build_fixture();
    let root = dir.path();

    let config = CleanupConfig {
        dry_run: false,
        ..CleanupConfig::default()
    };
    let outcome = CleanupPipeline::new(root.to_path_buf(), config)
        .run()
        .unwrap();

    let report = &outcome.report;
    assert!(!report.dry_run);
    assert_eq!(report.counts.imports_removed, 1, "LegacyFormatter import");
    assert_eq!(report.counts.methods_removed, 1, "legacyTotal method");
    assert_eq!(report.counts.variables_removed, 1, "$draft variable");
    assert_eq!(report.counts.files_deleted, 1, "orphaned old_logo.png");
    assert_eq!(report.counts.components_created, 1, "promo-banner component");
    assert_eq!(report.counts.failed_operations, 0, "errors: {:?}", report.errors);

    // The service lost exactly the dead pieces
    let service = fs::read_to_string(root.join("app/Services/InvoiceService.php")).unwrap();
    assert!(!service.contains("LegacyFormatter"));
    assert!(!service.contains("legacyTotal"));
    assert!(!service.contains("$draft"));
    assert!(service.contains("public function total"));
    assert!(service.contains("use App\\Models\\Invoice;"));

    // The orphan is gone, the views now share one component
    assert!(!root.join("public/images/old_logo.png").exists());
    let component = root.join("resources/views/components/promo-banner.blade.php");
    assert!(component.exists());
    assert!(fs::read_to_string(component).unwrap().contains("promo-banner"));
    for view in ["home", "shop", "checkout"] {
        let content =
            fs::read_to_string(root.join(format!("resources/views/{view}.blade.php"))).unwrap();
        assert!(content.contains("@include('components.promo-banner')"));
        assert!(!content.contains("<h2>"));
    }

    // Post-flight validation found no regressions
    let post = report.post_validation.as_ref().unwrap();
    assert!(!post.rollback_required, "references: {:?}", post.remaining_references);

    // Pre-flight validation ran and passed
    let safety = report.safety.as_ref().unwrap();
    assert!(safety.safe_to_proceed);
    assert!(safety.backup_id.is_some());

    // The log recorded every operation's lifecycle
    let stats = outcome.log.statistics();
    assert!(stats.completed >= 4);
    assert_eq!(stats.failed, 0);
}

#[test]
fn dry_run_plans_the_same_work_but_mutates_nothing() {
    let dir = build_fixture();
    let root = dir.path();

    let config = CleanupConfig {
        dry_run: true,
        ..CleanupConfig::default()
    };
    let outcome = CleanupPipeline::new(root.to_path_buf(), config)
        .run()
        .unwrap();

    assert!(outcome.report.dry_run);
    assert!(outcome.plan.imports_to_remove.len() == 1);
    assert!(outcome.plan.methods_to_remove.len() == 1);
    assert!(!outcome.plan.components_to_create.is_empty());
    assert_eq!(outcome.report.counts.total_removals(), 0);

    // Nothing moved: no component, no deletion, no edits, no new commits
    assert!(!root.join("resources/views/components").exists());
    assert!(root.join("public/images/old_logo.png").exists());
    let service = fs::read_to_string(root.join("app/Services/InvoiceService.php")).unwrap();
    assert_eq!(service, INVOICE_SERVICE);

    let repo = Repository::open(root).unwrap();
    let head = repo.head().unwrap().peel_to_commit().unwrap();
    assert_eq!(head.message(), Some("initial tree"));
}

#[test]
fn dynamic_dispatch_over_a_candidate_blocks_execution() {
    let dir = build_fixture();
    let root = dir.path();

    // A dispatcher that reaches the candidate by quoted name makes its
    // removal unsafe
    fs::write(
        root.join("app/Services/Dispatcher.php"),
        "<?php\n\nnamespace App\\Services;\n\nclass Dispatcher\n{\n    public function fire()\n    {\n        $svc = new InvoiceService();\n        return call_user_func([$svc, 'legacyTotal']);\n    }\n}\n",
    )
    .unwrap();
    commit_all(root, "add dispatcher");

    let config = CleanupConfig {
        dry_run: false,
        ..CleanupConfig::default()
    };
    let outcome = CleanupPipeline::new(root.to_path_buf(), config)
        .run()
        .unwrap();

    let safety = outcome.report.safety.as_ref().unwrap();
    assert!(!safety.safe_to_proceed);
    assert_eq!(outcome.report.counts.total_removals(), 0);

    // The tree is untouched
    let service = fs::read_to_string(root.join("app/Services/InvoiceService.php")).unwrap();
    assert_eq!(service, INVOICE_SERVICE);
    assert!(root.join("public/images/old_logo.png").exists());
}

#[test]
fn report_serializes_for_front_end_rendering() {
    let dir = build_fixture();
    let config = CleanupConfig {
        dry_run: true,
        ..CleanupConfig::default()
    };
    let outcome = CleanupPipeline::new(dir.path().to_path_buf(), config)
        .run()
        .unwrap();

    let json = serde_json::to_value(&outcome.report).unwrap();
    assert!(json["counts"].is_object());
    assert!(json["generated_at"].is_string());

    let log_json = serde_json::to_value(outcome.log.entries()).unwrap();
    assert!(log_json.is_array());
}
