use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use tracing::debug;

use crate::dom::{self, NodeId};
use crate::error::AgentResult;
use crate::host::{OverlayKind, OverlayNode, SharedHost};
use crate::incident::{IncidentStatus, RemoteIncident, SharedIncidentSource};
use crate::types::Rect;

use super::urlmatch;

struct IncidentOverlay {
    incident: RemoteIncident,
    highlight: NodeId,
    badge: NodeId,
}

/// Keeps badge/highlight overlays in sync with the remote incident
/// list.
///
/// Overlays are keyed by incident id and reconciled as a diff: each
/// poll removes stale entries, creates new ones, restyles status
/// changes and repositions survivors. A hash of id+status pairs
/// short-circuits the full pass when the remote set is unchanged, and
/// scroll/resize repositioning moves existing nodes without touching
/// the set.
pub struct OverlayReconciler {
    host: SharedHost,
    source: SharedIncidentSource,
    overlays: HashMap<String, IncidentOverlay>,
    last_fingerprint: Option<u64>,
    popup: Option<(String, NodeId)>,
}

impl OverlayReconciler {
    pub fn new(host: SharedHost, source: SharedIncidentSource) -> Self {
        Self {
            host,
            source,
            overlays: HashMap::new(),
            last_fingerprint: None,
            popup: None,
        }
    }

    pub fn overlay_count(&self) -> usize {
        self.overlays.len()
    }

    /// One poll cycle. Returns the number of incidents currently
    /// anchored to a visible element.
    pub async fn poll_once(&mut self) -> AgentResult<usize> {
        let page_url = self.host.navigation().url;
        let incidents = self.source.list_incidents(&page_url).await?;
        let matches = self.resolve_matches(&page_url, incidents);

        let fingerprint = fingerprint(&matches);
        if self.last_fingerprint == Some(fingerprint) {
            // Remote set unchanged; only positions may have drifted.
            self.reposition();
            return Ok(self.overlays.len());
        }

        self.reconcile(matches);
        self.last_fingerprint = Some(fingerprint);
        Ok(self.overlays.len())
    }

    /// Position-only update on scroll/resize: move existing nodes, no
    /// create/remove.
    pub fn reposition(&mut self) {
        let dom = self.host.dom();
        for overlay in self.overlays.values() {
            let Some(selector) = overlay.incident.selector.as_deref() else {
                continue;
            };
            let Some(element) = dom.query_selector(selector) else {
                continue;
            };
            let rect = dom.bounding_box(element);
            let _ = self.host.update_overlay(overlay.highlight, rect);
            let _ = self.host.update_overlay(overlay.badge, badge_rect(&rect));
        }
    }

    /// Open the detail popup for a badge click.
    pub fn open_popup(&mut self, incident_id: &str) -> AgentResult<()> {
        self.close_popup();
        let Some(overlay) = self.overlays.get(incident_id) else {
            return Ok(());
        };
        let dom = self.host.dom();
        let anchor = overlay
            .incident
            .selector
            .as_deref()
            .and_then(|s| dom.query_selector(s))
            .map(|el| dom.bounding_box(el))
            .unwrap_or_else(|| Rect::new(0.0, 0.0, 0.0, 0.0));
        let label = format!(
            "{} · {:?} · {:?}",
            overlay.incident.title, overlay.incident.priority, overlay.incident.status
        );
        let node = self.host.mount_overlay(
            OverlayNode::new(
                OverlayKind::IncidentPopup,
                Rect::new(anchor.x, anchor.y + anchor.height + 8.0, 280.0, 120.0),
            )
            .with_label(label),
        )?;
        self.popup = Some((incident_id.to_string(), node));
        Ok(())
    }

    pub fn close_popup(&mut self) {
        if let Some((_, node)) = self.popup.take() {
            let _ = self.host.remove_overlay(node);
        }
    }

    /// Popup quick action: resolve the incident through the status side
    /// channel and drop its overlay immediately.
    pub async fn resolve_incident(&mut self, incident_id: &str) -> AgentResult<()> {
        self.source
            .set_status(incident_id, IncidentStatus::Resolved)
            .await?;
        self.close_popup();
        if let Some(overlay) = self.overlays.remove(incident_id) {
            let _ = self.host.remove_overlay(overlay.highlight);
            let _ = self.host.remove_overlay(overlay.badge);
        }
        // Force a full pass next poll.
        self.last_fingerprint = None;
        Ok(())
    }

    /// Remove every overlay node this reconciler owns.
    pub fn clear(&mut self) {
        self.close_popup();
        for (_, overlay) in self.overlays.drain() {
            let _ = self.host.remove_overlay(overlay.highlight);
            let _ = self.host.remove_overlay(overlay.badge);
        }
        self.last_fingerprint = None;
    }

    fn resolve_matches(
        &self,
        page_url: &str,
        incidents: Vec<RemoteIncident>,
    ) -> Vec<(RemoteIncident, Rect)> {
        let dom = self.host.dom();
        incidents
            .into_iter()
            .filter(|incident| !incident.status.is_terminal())
            .filter(|incident| match incident.page_url.as_deref() {
                Some(stored) => urlmatch::matches_page(stored, page_url),
                None => true,
            })
            .filter_map(|incident| {
                let selector = incident.selector.as_deref()?;
                let element = dom.query_selector(selector)?;
                if !dom::is_visible(dom, element) {
                    return None;
                }
                let rect = dom.bounding_box(element);
                Some((incident, rect))
            })
            .collect()
    }

    fn reconcile(&mut self, matches: Vec<(RemoteIncident, Rect)>) {
        let current_ids: Vec<&str> = matches.iter().map(|(i, _)| i.id.as_str()).collect();

        // Remove overlays whose incident vanished from the match set.
        let stale: Vec<String> = self
            .overlays
            .keys()
            .filter(|id| !current_ids.contains(&id.as_str()))
            .cloned()
            .collect();
        for id in stale {
            if let Some(overlay) = self.overlays.remove(&id) {
                let _ = self.host.remove_overlay(overlay.highlight);
                let _ = self.host.remove_overlay(overlay.badge);
            }
            if matches!(&self.popup, Some((popup_id, _)) if popup_id == &id) {
                self.close_popup();
            }
        }

        for (incident, rect) in matches {
            match self.overlays.get_mut(&incident.id) {
                Some(existing) => {
                    if existing.incident.status != incident.status {
                        // Restyle: the badge reflects status.
                        let _ = self.host.remove_overlay(existing.badge);
                        if let Ok(badge) = mount_badge(&self.host, &incident, &rect) {
                            existing.badge = badge;
                        }
                    } else {
                        let _ = self.host.update_overlay(existing.badge, badge_rect(&rect));
                    }
                    let _ = self.host.update_overlay(existing.highlight, rect);
                    existing.incident = incident;
                }
                None => {
                    let Ok(highlight) = self
                        .host
                        .mount_overlay(OverlayNode::new(OverlayKind::IncidentHighlight, rect))
                    else {
                        continue;
                    };
                    let Ok(badge) = mount_badge(&self.host, &incident, &rect) else {
                        let _ = self.host.remove_overlay(highlight);
                        continue;
                    };
                    debug!(id = %incident.id, "mounting incident overlay");
                    self.overlays.insert(
                        incident.id.clone(),
                        IncidentOverlay { incident, highlight, badge },
                    );
                }
            }
        }
    }
}

fn badge_rect(element: &Rect) -> Rect {
    Rect::new(element.x + element.width - 10.0, element.y - 10.0, 20.0, 20.0)
}

fn mount_badge(
    host: &SharedHost,
    incident: &RemoteIncident,
    rect: &Rect,
) -> AgentResult<NodeId> {
    host.mount_overlay(
        OverlayNode::new(OverlayKind::IncidentBadge, badge_rect(rect))
            .with_label(format!("{}:{:?}", incident.id, incident.status)),
    )
}

/// Change-detection hash over sorted id+status pairs.
fn fingerprint(matches: &[(RemoteIncident, Rect)]) -> u64 {
    let mut pairs: Vec<(&str, IncidentStatus)> = matches
        .iter()
        .map(|(incident, _)| (incident.id.as_str(), incident.status))
        .collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));
    let mut hasher = DefaultHasher::new();
    pairs.hash(&mut hasher);
    hasher.finish()
}
