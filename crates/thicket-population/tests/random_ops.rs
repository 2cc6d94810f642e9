//! Random create/kill/move sequences keep queries and the index consistent.

use std::collections::HashSet;

use proptest::prelude::*;
use thicket_core::{SpeciesId, TreeType};
use thicket_index::{QuerySpec, TreeHandle};
use thicket_population::{DeathReason, Population};
use thicket_test_utils::fixtures;

const X_LEN: f32 = 30.0;
const Y_LEN: f32 = 22.0;

#[derive(Clone, Debug)]
enum Op {
    Create { x: f32, y: f32, species: u16, stage: usize, size: f32 },
    Kill { pick: usize, reason: usize },
    Move { pick: usize, x: f32, y: f32, now: bool },
    Grow { pick: usize, size: f32 },
    EndTimestep,
}

const STAGES: [TreeType; 4] = [
    TreeType::Seed,
    TreeType::Seedling,
    TreeType::Sapling,
    TreeType::Adult,
];

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0.0..X_LEN, 0.0..Y_LEN, 0u16..3, 0usize..4, 0.0f32..30.0).prop_map(
            |(x, y, species, stage, size)| Op::Create { x, y, species, stage, size }
        ),
        2 => (any::<usize>(), 0usize..7).prop_map(|(pick, reason)| Op::Kill { pick, reason }),
        2 => (any::<usize>(), 0.0..X_LEN, 0.0..Y_LEN, any::<bool>())
            .prop_map(|(pick, x, y, now)| Op::Move { pick, x, y, now }),
        1 => (any::<usize>(), 0.1f32..20.0).prop_map(|(pick, size)| Op::Grow { pick, size }),
        1 => Just(Op::EndTimestep),
    ]
}

fn live(pop: &Population, planted: &[TreeHandle]) -> Vec<TreeHandle> {
    planted.iter().copied().filter(|h| pop.contains(*h)).collect()
}

fn apply(pop: &mut Population, planted: &mut Vec<TreeHandle>, op: &Op) {
    match *op {
        Op::Create { x, y, species, stage, size } => {
            let tree = pop
                .create(x, y, SpeciesId(species), STAGES[stage], size)
                .unwrap();
            planted.push(tree);
        }
        Op::Kill { pick, reason } => {
            let alive = live(pop, planted);
            if !alive.is_empty() {
                let reason = DeathReason::ALL[reason];
                pop.kill(alive[pick % alive.len()], reason).unwrap();
            }
        }
        Op::Move { pick, x, y, now } => {
            let alive = live(pop, planted);
            if !alive.is_empty() {
                let tree = alive[pick % alive.len()];
                let record = pop.record(tree);
                let geometry = record.geometry();
                pop.set_float_with(tree, geometry.x, x, now, true).unwrap();
                pop.set_float_with(tree, geometry.y, y, now, true).unwrap();
            }
        }
        Op::Grow { pick, size } => {
            let alive = live(pop, planted);
            if !alive.is_empty() {
                let tree = alive[pick % alive.len()];
                let record = pop.record(tree);
                let codes = *pop.builtins().get(record.species(), record.tree_type());
                if let Some(code) = codes.size(record.tree_type()) {
                    pop.set_float(tree, code, size).unwrap();
                }
            }
        }
        Op::EndTimestep => {
            pop.end_timestep();
        }
    }
}

/// One mutation of the tree a walk is standing on.
#[derive(Clone, Debug)]
enum Touch {
    Kill { reason: usize },
    Grow { size: f32, now: bool },
    Move { x: f32, y: f32, now: bool },
    Plant { x: f32, y: f32 },
    Nothing,
}

fn touch() -> impl Strategy<Value = Touch> {
    prop_oneof![
        (0usize..7).prop_map(|reason| Touch::Kill { reason }),
        (0.1f32..40.0, any::<bool>()).prop_map(|(size, now)| Touch::Grow { size, now }),
        (0.0..X_LEN, 0.0..Y_LEN, any::<bool>()).prop_map(|(x, y, now)| Touch::Move { x, y, now }),
        (0.0..X_LEN, 0.0..Y_LEN).prop_map(|(x, y)| Touch::Plant { x, y }),
        Just(Touch::Nothing),
    ]
}

fn apply_touch(pop: &mut Population, tree: TreeHandle, touch: &Touch) {
    match *touch {
        Touch::Kill { reason } => {
            pop.kill(tree, DeathReason::ALL[reason]).unwrap();
        }
        Touch::Grow { size, now } => {
            let record = pop.record(tree);
            let codes = *pop.builtins().get(record.species(), record.tree_type());
            if let Some(code) = codes.size(record.tree_type()) {
                pop.set_float_with(tree, code, size, now, true).unwrap();
            }
        }
        Touch::Move { x, y, now } => {
            let geometry = pop.record(tree).geometry();
            pop.set_float_with(tree, geometry.x, x, now, true).unwrap();
            pop.set_float_with(tree, geometry.y, y, now, true).unwrap();
        }
        Touch::Plant { x, y } => {
            pop.create(x, y, SpeciesId(0), TreeType::Adult, 0.0).unwrap();
        }
        Touch::Nothing => {}
    }
}

fn check(pop: &Population, planted: &[TreeHandle], anchor: (f32, f32), radius: f32) {
    pop.verify().unwrap();
    let expected: HashSet<_> = live(pop, planted).into_iter().collect();
    let mut cursor = pop.find_str("all").unwrap();
    let got: Vec<_> = cursor.iter(pop).collect();
    assert_eq!(got.len(), expected.len(), "duplicates or misses in 'all'");
    assert_eq!(got.into_iter().collect::<HashSet<_>>(), expected);

    // Deferred writes leave trees at their old places until the resort.
    if pop.index().is_dirty() {
        return;
    }
    let near: HashSet<_> = expected
        .iter()
        .copied()
        .filter(|h| {
            let r = pop.record(*h);
            r.height() > 1.0 && pop.plot().distance(anchor.0, anchor.1, r.x(), r.y()) <= radius
        })
        .collect();
    let mut cursor = pop
        .find(QuerySpec::distance(anchor.0, anchor.1, radius, 1.0))
        .unwrap();
    assert_eq!(cursor.iter(pop).collect::<HashSet<_>>(), near);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn random_operations_stay_consistent(
        ops in prop::collection::vec(op(), 1..80),
        ax in 0.0..X_LEN,
        ay in 0.0..Y_LEN,
        radius in 0.0f32..15.0,
    ) {
        let mut pop = fixtures::population(X_LEN, Y_LEN, 3);
        let mut planted = Vec::new();
        for op in &ops {
            apply(&mut pop, &mut planted, op);
            check(&pop, &planted, (ax, ay), radius);
        }
        pop.end_timestep();
        check(&pop, &planted, (ax, ay), radius);
    }

    #[test]
    fn mutating_the_current_tree_keeps_the_walk_complete(
        ops in prop::collection::vec(op(), 1..60),
        touches in prop::collection::vec(touch(), 1..20),
        query in prop::sample::select(vec!["all", "type=0,1,2,3", "type=2,3", "species=0,2"]),
    ) {
        let mut pop = fixtures::population(X_LEN, Y_LEN, 3);
        let mut planted = Vec::new();
        for op in &ops {
            apply(&mut pop, &mut planted, op);
        }
        let mut before = pop.find_str(query).unwrap();
        let expected: HashSet<_> = before.iter(&pop).collect();

        let mut cursor = pop.find_str(query).unwrap();
        let mut visited = HashSet::new();
        let mut n = 0;
        while let Some(tree) = cursor.next(&pop) {
            prop_assert!(visited.insert(tree), "{} visited twice", tree);
            apply_touch(&mut pop, tree, &touches[n % touches.len()]);
            n += 1;
        }
        prop_assert_eq!(visited, expected);
        pop.verify().map_err(TestCaseError::fail)?;
        pop.end_timestep();
        pop.verify().map_err(TestCaseError::fail)?;
    }
}
