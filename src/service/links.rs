//! Link management between clients and delivery points.
//!
//! There is one association relation. [`LinkManager`] holds the logic once and
//! is instantiated for each direction through a [`LinkView`], which only says
//! which side owns the call and how to read the other side back.

use std::collections::BTreeSet;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;

use crate::db::Store;
use crate::error::{Error, Result};
use crate::logging::RequestContext;
use crate::models::{Client, DeliveryPoint, EntityKind, Link};

/// One perspective on the association: the owner anchors the call, the peer is
/// what gets linked and listed.
#[async_trait]
pub trait LinkView: Send + Sync + 'static {
    type Peer: Send;

    const OWNER: EntityKind;
    const PEER: EntityKind;

    fn link(owner: i32, peer: i32) -> Link;
    fn peer_id(peer: &Self::Peer) -> i32;
    async fn peers(store: &dyn Store, owner: i32) -> Result<Vec<Self::Peer>>;
}

/// Delivery points as seen from a client.
pub struct DeliveryPointsOfClient;

#[async_trait]
impl LinkView for DeliveryPointsOfClient {
    type Peer = DeliveryPoint;

    const OWNER: EntityKind = EntityKind::Client;
    const PEER: EntityKind = EntityKind::DeliveryPoint;

    fn link(owner: i32, peer: i32) -> Link {
        Link {
            client_id: owner,
            delivery_point_id: peer,
        }
    }

    fn peer_id(peer: &DeliveryPoint) -> i32 {
        peer.id
    }

    async fn peers(store: &dyn Store, owner: i32) -> Result<Vec<DeliveryPoint>> {
        store.linked_delivery_points(owner).await
    }
}

/// Clients as seen from a delivery point.
pub struct ClientsOfDeliveryPoint;

#[async_trait]
impl LinkView for ClientsOfDeliveryPoint {
    type Peer = Client;

    const OWNER: EntityKind = EntityKind::DeliveryPoint;
    const PEER: EntityKind = EntityKind::Client;

    fn link(owner: i32, peer: i32) -> Link {
        Link {
            client_id: peer,
            delivery_point_id: owner,
        }
    }

    fn peer_id(peer: &Client) -> i32 {
        peer.id
    }

    async fn peers(store: &dyn Store, owner: i32) -> Result<Vec<Client>> {
        store.linked_clients(owner).await
    }
}

pub struct LinkManager<V> {
    store: Arc<dyn Store>,
    view: PhantomData<fn() -> V>,
}

impl<V> Clone for LinkManager<V> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            view: PhantomData,
        }
    }
}

pub type ClientLinks = LinkManager<DeliveryPointsOfClient>;
pub type DeliveryPointLinks = LinkManager<ClientsOfDeliveryPoint>;

impl<V: LinkView> LinkManager<V> {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            view: PhantomData,
        }
    }

    pub async fn list_links(&self, owner: i32) -> Result<Vec<V::Peer>> {
        self.ensure_exists(V::OWNER, owner).await?;
        V::peers(self.store.as_ref(), owner).await
    }

    /// Links every id in `peer_ids` to `owner` and returns the owner's full
    /// peer list afterwards.
    ///
    /// An empty request changes nothing. If any requested peer does not
    /// exist the whole call fails with all missing ids, sorted, and nothing
    /// is linked. Pairs that are already linked are left as they are.
    pub async fn link(
        &self,
        ctx: &RequestContext,
        owner: i32,
        peer_ids: &[i32],
    ) -> Result<Vec<V::Peer>> {
        self.ensure_exists(V::OWNER, owner).await?;

        let current = V::peers(self.store.as_ref(), owner).await?;
        if peer_ids.is_empty() {
            return Ok(current);
        }

        let requested: BTreeSet<i32> = peer_ids.iter().copied().collect();
        let wanted: Vec<i32> = requested.iter().copied().collect();
        let found: BTreeSet<i32> = self
            .store
            .existing_ids(V::PEER, &wanted)
            .await?
            .into_iter()
            .collect();

        let missing: Vec<i32> = requested.difference(&found).copied().collect();
        if !missing.is_empty() {
            tracing::info!(
                request_id = %ctx.request_id,
                owner,
                ?missing,
                "link rejected: {} missing",
                V::PEER.plural().to_lowercase()
            );
            return Err(Error::MissingPeers {
                kind: V::PEER,
                ids: missing,
            });
        }

        let linked: BTreeSet<i32> = current.iter().map(V::peer_id).collect();
        let additions: Vec<Link> = found
            .difference(&linked)
            .map(|&peer| V::link(owner, peer))
            .collect();

        if additions.is_empty() {
            tracing::debug!(request_id = %ctx.request_id, owner, "link request already satisfied");
            return Ok(current);
        }

        // The owner or a peer can vanish between the checks above and the insert.
        self.store
            .add_links(&additions)
            .await
            .map_err(|err| match err {
                Error::MissingPeers { kind, .. } if kind == V::OWNER => Error::NotFound(V::OWNER),
                other => other,
            })?;
        tracing::info!(
            request_id = %ctx.request_id,
            owner,
            added = additions.len(),
            "{} linked to {}",
            V::PEER.plural().to_lowercase(),
            V::OWNER.noun()
        );

        V::peers(self.store.as_ref(), owner).await
    }

    /// Removes one pair. Unlike [`link`](Self::link) this is strict: a pair
    /// that is not linked is an error.
    pub async fn unlink(&self, ctx: &RequestContext, owner: i32, peer: i32) -> Result<()> {
        self.ensure_exists(V::OWNER, owner).await?;
        self.ensure_exists(V::PEER, peer).await?;

        let link = V::link(owner, peer);
        let not_associated = Error::NotAssociated {
            owner: V::OWNER,
            peer: V::PEER,
        };
        if !self.store.is_linked(link).await? {
            return Err(not_associated);
        }
        // A concurrent unlink may have won between the check and the delete.
        if !self.store.remove_link(link).await? {
            return Err(not_associated);
        }

        tracing::info!(
            request_id = %ctx.request_id,
            client_id = link.client_id,
            delivery_point_id = link.delivery_point_id,
            "link removed"
        );
        Ok(())
    }

    async fn ensure_exists(&self, kind: EntityKind, id: i32) -> Result<()> {
        if self.store.existing_ids(kind, &[id]).await?.is_empty() {
            return Err(Error::NotFound(kind));
        }
        Ok(())
    }
}
