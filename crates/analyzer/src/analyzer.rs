//! Safety Classification Module
//!
//! This module partitions the messages of a global view into safe, unsafe
//! and bivalent sets and derives finality metrics from that partition.
//!
//! Every query re-reads the view: nothing is cached between calls, so two
//! calls against a view that changed in between may disagree.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use finality_protocol::{Message, MessageId};
use finality_view::{ChainBuilder, GlobalView, ParentChain};
use tracing::{debug, warn};

use crate::errors::AnalysisError;
use crate::Result;

/// Safety category of a single message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    /// On the finalized chain
    Safe,
    /// At or below the safe tip but not finalized; orphaned
    Unsafe,
    /// Above the safe tip; fate still open
    Bivalent,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Safe => "safe",
            Category::Unsafe => "unsafe",
            Category::Bivalent => "bivalent",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three-way split of a view, computed once per query.
struct Partition<'a> {
    safe: BTreeSet<MessageId>,
    unsafe_: BTreeSet<MessageId>,
    bivalent: BTreeSet<MessageId>,
    safe_tip: Option<&'a Message>,
}

/// Read-only analyzer bound to one global view
pub struct Analyzer<'a, V: GlobalView, B: ChainBuilder = ParentChain> {
    view: &'a V,
    chain_builder: B,
}

impl<'a, V: GlobalView> Analyzer<'a, V> {
    /// Create an analyzer that walks the finalized chain along first parents
    pub fn new(view: &'a V) -> Self {
        Self::with_chain_builder(view, ParentChain)
    }
}

impl<'a, V: GlobalView, B: ChainBuilder> Analyzer<'a, V, B> {
    /// Create an analyzer with a custom chain builder
    pub fn with_chain_builder(view: &'a V, chain_builder: B) -> Self {
        Analyzer {
            view,
            chain_builder,
        }
    }

    /// Every message in the view
    pub fn messages(&self) -> BTreeSet<MessageId> {
        self.view.messages().keys().cloned().collect()
    }

    /// Messages on the chain from the last finalized block down to genesis
    pub fn safe_messages(&self) -> Result<BTreeSet<MessageId>> {
        let finalized = match self.view.last_finalized_block() {
            Some(block) => block,
            None => return Ok(BTreeSet::new()),
        };

        let links = self
            .chain_builder
            .build_chain(self.view, &finalized.id, None)?;

        Ok(links.into_iter().map(|(id, _)| id).collect())
    }

    /// Highest safe message.
    ///
    /// Equal heights are broken by the greatest message id, which keeps the
    /// choice stable across runs.
    pub fn safe_tip(&self) -> Result<Option<&'a Message>> {
        let safe = self.safe_messages()?;
        Ok(self.highest(&safe))
    }

    /// Height of the safe tip, `None` before anything is finalized
    pub fn safe_tip_height(&self) -> Result<Option<u64>> {
        Ok(self.safe_tip()?.map(|tip| tip.height))
    }

    /// Non-safe messages at or below the safe tip
    pub fn unsafe_messages(&self) -> Result<BTreeSet<MessageId>> {
        Ok(self.partition()?.unsafe_)
    }

    /// Messages whose fate is still open
    pub fn bivalent_messages(&self) -> Result<BTreeSet<MessageId>> {
        Ok(self.partition()?.bivalent)
    }

    /// Category of every message in the view
    pub fn classify(&self) -> Result<BTreeMap<MessageId, Category>> {
        let partition = self.partition()?;

        let mut categories = BTreeMap::new();
        for (ids, category) in [
            (partition.safe, Category::Safe),
            (partition.unsafe_, Category::Unsafe),
            (partition.bivalent, Category::Bivalent),
        ] {
            categories.extend(ids.into_iter().map(|id| (id, category)));
        }

        Ok(categories)
    }

    pub fn num_messages(&self) -> usize {
        self.view.messages().len()
    }

    pub fn num_safe_messages(&self) -> Result<usize> {
        Ok(self.safe_messages()?.len())
    }

    pub fn num_unsafe_messages(&self) -> Result<usize> {
        Ok(self.unsafe_messages()?.len())
    }

    pub fn num_bivalent_messages(&self) -> Result<usize> {
        Ok(self.bivalent_messages()?.len())
    }

    /// Share of all messages that are safe. Fails on an empty view.
    pub fn prop_safe_messages(&self) -> Result<f64> {
        let total = self.num_messages();
        if total == 0 {
            return Err(AnalysisError::EmptyView);
        }
        Ok(self.num_safe_messages()? as f64 / total as f64)
    }

    /// How far the current estimate has advanced past the safe tip.
    ///
    /// Without a safe tip the distance is counted from just below genesis.
    pub fn safe_to_tip_length(&self) -> Result<i64> {
        let estimate = self.view.estimate().ok_or(AnalysisError::NoEstimate)?;
        let estimate_height = estimate.height as i64;

        Ok(match self.safe_tip_height()? {
            Some(height) => estimate_height - height as i64,
            None => estimate_height + 1,
        })
    }

    /// Height span of the bivalent frontier above the safe tip.
    ///
    /// Fails when no message is bivalent.
    pub fn bivalent_message_depth(&self) -> Result<u64> {
        let partition = self.partition()?;
        self.depth_of(&partition)
    }

    /// Average number of recorded children over the bivalent messages and
    /// the safe tip. Messages without recorded children are not counted.
    pub fn bivalent_message_branching_factor(&self) -> Result<f64> {
        let partition = self.partition()?;

        let mut to_check = partition.bivalent;
        if let Some(tip) = partition.safe_tip {
            to_check.insert(tip.id.clone());
        }

        let mut branches = 0usize;
        let mut num_checked = 0usize;
        while let Some(id) = to_check.pop_first() {
            if let Some(children) = self.view.children(&id) {
                if !children.is_empty() {
                    branches += children.len();
                    num_checked += 1;
                }
            }
        }

        if num_checked == 0 {
            return Ok(0.0);
        }
        Ok(branches as f64 / num_checked as f64)
    }

    /// Effective branching factor `N^(1/d)` for `N` bivalent messages spread
    /// over depth `d`.
    pub fn bivalent_message_branching_factor_estimate(&self) -> Result<f64> {
        let partition = self.partition()?;
        let depth = self.depth_of(&partition)?;
        let count = partition.bivalent.len() as f64;

        Ok(count.powf(1.0 / depth as f64))
    }

    /// Mean time from being added to being finalized, over safe messages.
    ///
    /// With nothing finalized this returns the message count instead.
    pub fn latency_to_finality(&self) -> Result<f64> {
        let safe = self.safe_messages()?;

        if safe.is_empty() {
            let fallback = self.num_messages();
            warn!(
                "No finalized messages; reporting latency to finality as message count {}",
                fallback
            );
            return Ok(fallback as f64);
        }

        let mut total = 0.0;
        for id in &safe {
            let finalized =
                self.view
                    .when_finalized(id)
                    .ok_or_else(|| AnalysisError::MissingTiming {
                        id: id.clone(),
                        field: "finalized",
                    })?;
            let added = self
                .view
                .when_added(id)
                .ok_or_else(|| AnalysisError::MissingTiming {
                    id: id.clone(),
                    field: "added",
                })?;
            total += finalized as f64 - added as f64;
        }

        Ok(total / safe.len() as f64)
    }

    /// Unsafe share of decided messages, 0 when nothing is decided yet.
    pub fn orphan_rate(&self) -> Result<f64> {
        let partition = self.partition()?;
        let num_unsafe = partition.unsafe_.len();
        let num_safe = partition.safe.len();

        if num_unsafe + num_safe == 0 {
            return Ok(0.0);
        }
        Ok(num_unsafe as f64 / (num_unsafe + num_safe) as f64)
    }

    fn partition(&self) -> Result<Partition<'a>> {
        let safe = self.safe_messages()?;
        let safe_tip = self.highest(&safe);

        let mut unsafe_ = BTreeSet::new();
        let mut bivalent = BTreeSet::new();
        for (id, message) in self.view.messages() {
            if safe.contains(id) {
                continue;
            }
            match safe_tip {
                Some(tip) if message.height <= tip.height => {
                    unsafe_.insert(id.clone());
                }
                _ => {
                    bivalent.insert(id.clone());
                }
            }
        }

        debug!(
            "Classified {} messages: {} safe, {} unsafe, {} bivalent",
            self.view.messages().len(),
            safe.len(),
            unsafe_.len(),
            bivalent.len()
        );

        Ok(Partition {
            safe,
            unsafe_,
            bivalent,
            safe_tip,
        })
    }

    fn depth_of(&self, partition: &Partition<'a>) -> Result<u64> {
        let max_height = partition
            .bivalent
            .iter()
            .filter_map(|id| self.view.message(id))
            .map(|message| message.height)
            .max()
            .ok_or(AnalysisError::NoBivalentMessages)?;

        Ok(match partition.safe_tip {
            Some(tip) => max_height - tip.height,
            None => max_height + 1,
        })
    }

    fn highest(&self, ids: &BTreeSet<MessageId>) -> Option<&'a Message> {
        let view: &'a V = self.view;
        ids.iter()
            .filter_map(|id| view.message(id))
            .max_by(|a, b| a.height.cmp(&b.height).then_with(|| a.id.cmp(&b.id)))
    }
}
