/*! Integration tests for Pagetree.
 *
 * This test suite is organized as a single integration test binary
 * following the pattern described by matklad in
 * https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html
 *
 * The module structure mirrors the public operation surface:
 * - pages: page lifecycle, reordering and properties
 * - blocks: block lifecycle and ordering
 * - components: component lifecycle, updates and locks
 * - moves: page reparenting and cross-container relocation
 * - clone: duplication of pages and blocks
 * - notifier: change listeners and local/remote classification
 * - import: descriptor import
 * - sync: update exchange between replicas
 * - invariants: whole-tree properties under operation sequences
 */

use tracing_subscriber::EnvFilter;

#[ctor::ctor]
fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("pagetree=info".parse().unwrap()),
        )
        .with_test_writer()
        .try_init();
}

mod blocks;
mod helpers;
mod moves;
mod notifier;
mod pages;
