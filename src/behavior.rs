//! Minimal behavior trees for composing motions.
//!
//! Nodes share a blackboard `B` (usually something holding a
//! [`crate::control::Controller`]). A node succeeds by returning `Ok(())`;
//! any error counts as failure.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;

use crate::{plog_debug, Result};

#[async_trait]
pub trait Node<B>: Send + Sync {
    async fn tick(&self, board: Arc<B>) -> Result<()>;

    /// Label for log output.
    fn name(&self) -> &str {
        "node"
    }
}

type BoxNode<B> = Box<dyn Node<B>>;

/// Runs children in order, stopping at the first failure.
pub struct Sequence<B> {
    children: Vec<BoxNode<B>>,
}

/// Runs children in order until one succeeds. Fails with the last child's
/// error if none do; an empty fallback succeeds.
pub struct Fallback<B> {
    children: Vec<BoxNode<B>>,
}

/// Runs all children concurrently and fails with the first error, in child
/// order, once every child has finished.
pub struct Parallel<B> {
    children: Vec<BoxNode<B>>,
}

macro_rules! control_node {
    ($ty:ident) => {
        impl<B> $ty<B>
        where
            B: Send + Sync + 'static,
        {
            pub fn new() -> Self {
                Self {
                    children: Vec::new(),
                }
            }

            pub fn append_child(mut self, child: impl Node<B> + 'static) -> Self {
                self.children.push(Box::new(child));
                self
            }

            pub fn len(&self) -> usize {
                self.children.len()
            }

            pub fn is_empty(&self) -> bool {
                self.children.is_empty()
            }
        }

        impl<B> Default for $ty<B>
        where
            B: Send + Sync + 'static,
        {
            fn default() -> Self {
                Self::new()
            }
        }
    };
}

control_node!(Sequence);
control_node!(Fallback);
control_node!(Parallel);

#[async_trait]
impl<B> Node<B> for Sequence<B>
where
    B: Send + Sync + 'static,
{
    async fn tick(&self, board: Arc<B>) -> Result<()> {
        for child in &self.children {
            child.tick(Arc::clone(&board)).await?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "sequence"
    }
}

#[async_trait]
impl<B> Node<B> for Fallback<B>
where
    B: Send + Sync + 'static,
{
    async fn tick(&self, board: Arc<B>) -> Result<()> {
        let mut last = None;
        for child in &self.children {
            match child.tick(Arc::clone(&board)).await {
                Ok(()) => return Ok(()),
                Err(err) => {
                    plog_debug!("fallback: {} failed: {}", child.name(), err);
                    last = Some(err);
                }
            }
        }
        last.map_or(Ok(()), Err)
    }

    fn name(&self) -> &str {
        "fallback"
    }
}

#[async_trait]
impl<B> Node<B> for Parallel<B>
where
    B: Send + Sync + 'static,
{
    async fn tick(&self, board: Arc<B>) -> Result<()> {
        let outcomes = join_all(
            self.children
                .iter()
                .map(|child| child.tick(Arc::clone(&board))),
        )
        .await;
        outcomes.into_iter().collect()
    }

    fn name(&self) -> &str {
        "parallel"
    }
}

/// Leaf node wrapping an async closure.
pub struct Action<F> {
    name: String,
    run: F,
}

impl<F> Action<F> {
    pub fn new(name: impl Into<String>, run: F) -> Self {
        Self {
            name: name.into(),
            run,
        }
    }
}

#[async_trait]
impl<B, F, Fut> Node<B> for Action<F>
where
    B: Send + Sync + 'static,
    F: Fn(Arc<B>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    async fn tick(&self, board: Arc<B>) -> Result<()> {
        (self.run)(board).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// A tree rooted at a single node.
pub struct BehaviorTree<B> {
    root: BoxNode<B>,
}

impl<B> BehaviorTree<B>
where
    B: Send + Sync + 'static,
{
    pub fn new(root: impl Node<B> + 'static) -> Self {
        Self {
            root: Box::new(root),
        }
    }

    pub async fn run(&self, board: Arc<B>) -> Result<()> {
        plog_debug!("behavior tree: ticking {}", self.root.name());
        self.root.tick(board).await
    }
}
