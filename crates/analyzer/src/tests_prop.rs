use std::collections::BTreeSet;

use finality_protocol::{Message, MessageId};
use finality_view::{GlobalView, SimulationView};
use proptest::prelude::*;

use crate::Analyzer;

fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(64);
    ProptestConfig {
        cases,
        ..ProptestConfig::default()
    }
}

prop_compose! {
    /// Each entry picks a chain parent and an optional extra justification
    /// among the messages created before it.
    fn arb_links()(links in prop::collection::vec((any::<usize>(), prop::option::of(any::<usize>())), 0..24))
        -> Vec<(usize, Option<usize>)>
    {
        links
    }
}

fn build_view(links: &[(usize, Option<usize>)], finalize: Option<usize>) -> SimulationView {
    let (mut view, genesis) = SimulationView::with_genesis();
    let mut created = vec![genesis];

    for (index, (parent, extra)) in links.iter().enumerate() {
        let chain_parent = created[parent % created.len()].clone();
        let mut parents = vec![&chain_parent];
        let justification = extra.map(|extra| created[extra % created.len()].clone());
        if let Some(justification) = &justification {
            if justification.id != chain_parent.id {
                parents.push(justification);
            }
        }

        let message = Message::new((index % 5) as u32 + 1, index as u64 + 1, &parents);
        view.add_message(message.clone(), index as u64 + 1).unwrap();
        created.push(message);
    }

    if let Some(choice) = finalize {
        let target = &created[choice % created.len()];
        view.finalize(&target.id, links.len() as u64 + 1).unwrap();
    }

    view
}

proptest! {
    #![proptest_config(proptest_config())]
    #[test]
    fn classification_partitions_messages(links in arb_links(), finalize in prop::option::of(any::<usize>())) {
        let view = build_view(&links, finalize);
        let analyzer = Analyzer::new(&view);

        let safe = analyzer.safe_messages().unwrap();
        let unsafe_ = analyzer.unsafe_messages().unwrap();
        let bivalent = analyzer.bivalent_messages().unwrap();

        prop_assert!(safe.is_disjoint(&unsafe_));
        prop_assert!(safe.is_disjoint(&bivalent));
        prop_assert!(unsafe_.is_disjoint(&bivalent));

        let union: BTreeSet<MessageId> = safe
            .iter()
            .chain(unsafe_.iter())
            .chain(bivalent.iter())
            .cloned()
            .collect();
        prop_assert_eq!(union, analyzer.messages());
    }
}

proptest! {
    #![proptest_config(proptest_config())]
    #[test]
    fn orphan_rate_is_a_proportion(links in arb_links(), finalize in prop::option::of(any::<usize>())) {
        let view = build_view(&links, finalize);
        let rate = Analyzer::new(&view).orphan_rate().unwrap();
        prop_assert!((0.0..=1.0).contains(&rate));
    }
}

proptest! {
    #![proptest_config(proptest_config())]
    #[test]
    fn safe_tip_is_the_finalized_block(links in arb_links(), finalize in prop::option::of(any::<usize>())) {
        let view = build_view(&links, finalize);
        let analyzer = Analyzer::new(&view);

        let tip = analyzer.safe_tip().unwrap().map(|m| m.id.clone());
        let finalized = view.last_finalized_block().map(|m| m.id.clone());
        prop_assert_eq!(tip, finalized);

        let tip_height = analyzer.safe_tip_height().unwrap();
        for id in analyzer.bivalent_messages().unwrap() {
            let height = view.message(&id).unwrap().height;
            prop_assert!(tip_height.map_or(true, |tip| height > tip));
        }
    }
}

#[test]
fn genesis_only_view_is_undecided() {
    let view = build_view(&[], None);
    let analyzer = Analyzer::new(&view);

    assert_eq!(analyzer.num_bivalent_messages().unwrap(), 1);
    assert_eq!(analyzer.bivalent_message_depth().unwrap(), 1);
    assert_eq!(analyzer.bivalent_message_branching_factor().unwrap(), 0.0);
}
