use crate::{Attachment, Error, Skeleton, SkeletonData};
use std::collections::HashMap;
use std::sync::Arc;

/// Attachments keyed by slot index and name, plus the bones and constraints that are only
/// active while this skin is set.
#[derive(Clone, Debug, Default)]
pub struct Skin {
    pub name: String,
    /// Indexed by slot.
    attachments: Vec<HashMap<String, Arc<Attachment>>>,
    pub bones: Vec<usize>,
    pub ik_constraints: Vec<usize>,
    pub transform_constraints: Vec<usize>,
    pub path_constraints: Vec<usize>,
    pub physics_constraints: Vec<usize>,
}

impl Skin {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn set_attachment(
        &mut self,
        slot_index: usize,
        name: impl Into<String>,
        attachment: Arc<Attachment>,
    ) {
        if self.attachments.len() <= slot_index {
            self.attachments.resize_with(slot_index + 1, HashMap::new);
        }
        self.attachments[slot_index].insert(name.into(), attachment);
    }

    pub fn attachment(&self, slot_index: usize, name: &str) -> Option<&Arc<Attachment>> {
        self.attachments.get(slot_index)?.get(name)
    }

    pub fn remove_attachment(&mut self, slot_index: usize, name: &str) -> Option<Arc<Attachment>> {
        self.attachments.get_mut(slot_index)?.remove(name)
    }

    pub fn attachments(&self) -> impl Iterator<Item = (usize, &str, &Arc<Attachment>)> {
        self.attachments.iter().enumerate().flat_map(|(slot, map)| {
            map.iter()
                .map(move |(name, attachment)| (slot, name.as_str(), attachment))
        })
    }

    pub fn attachments_for_slot(
        &self,
        slot_index: usize,
    ) -> impl Iterator<Item = (&str, &Arc<Attachment>)> {
        self.attachments
            .get(slot_index)
            .into_iter()
            .flat_map(|map| map.iter().map(|(name, a)| (name.as_str(), a)))
    }

    pub fn len(&self) -> usize {
        self.attachments.iter().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.attachments.iter().all(HashMap::is_empty)
    }

    pub fn clear(&mut self) {
        self.attachments.clear();
    }

    /// Adds the bones, constraints and attachments of `other`, sharing its attachments.
    pub fn add_skin(&mut self, other: &Skin) {
        self.merge_requirements(other);
        for (slot, name, attachment) in other.attachments() {
            self.set_attachment(slot, name, Arc::clone(attachment));
        }
    }

    /// Like [`Skin::add_skin`], but attachments are copied. Meshes become linked meshes so
    /// they keep following the source mesh's deform keys.
    pub fn copy_skin(&mut self, other: &Skin) {
        self.merge_requirements(other);
        for (slot, name, attachment) in other.attachments() {
            let copy = match attachment.as_ref() {
                Attachment::Mesh(mesh) => Attachment::Mesh(mesh.new_linked(mesh.name.clone())),
                other => other.clone(),
            };
            self.set_attachment(slot, name, Arc::new(copy));
        }
    }

    /// Replaces attachments from `old_skin` that are currently attached with this skin's
    /// attachments of the same slot and name.
    pub(crate) fn attach_all(&self, skeleton: &mut Skeleton, old_skin: &Skin) {
        for (slot_index, name, attachment) in old_skin.attachments() {
            let Some(slot) = skeleton.slots.get_mut(slot_index) else {
                continue;
            };
            let attached = slot
                .attachment()
                .is_some_and(|current| Arc::ptr_eq(current, attachment));
            if !attached {
                continue;
            }
            if let Some(replacement) = self.attachment(slot_index, name) {
                slot.set_attachment(Some(Arc::clone(replacement)));
            }
        }
    }

    fn merge_requirements(&mut self, other: &Skin) {
        fn union(into: &mut Vec<usize>, from: &[usize]) {
            for &i in from {
                if !into.contains(&i) {
                    into.push(i);
                }
            }
        }
        union(&mut self.bones, &other.bones);
        union(&mut self.ik_constraints, &other.ik_constraints);
        union(&mut self.transform_constraints, &other.transform_constraints);
        union(&mut self.path_constraints, &other.path_constraints);
        union(&mut self.physics_constraints, &other.physics_constraints);
    }

    pub(crate) fn validate(&self, data: &SkeletonData) -> Result<(), Error> {
        let out_of_range = |what: &str, index: usize| {
            Error::invalid_data(format!("skin '{}' references {what} {index}", self.name))
        };
        for (slot, _, attachment) in self.attachments() {
            if slot >= data.slots.len() {
                return Err(out_of_range("slot", slot));
            }
            if let Some(vertex_data) = attachment.vertex_data() {
                if let crate::Vertices::Weighted(vertices) = &vertex_data.vertices {
                    for w in vertices.iter().flatten() {
                        if w.bone >= data.bones.len() {
                            return Err(out_of_range("bone", w.bone));
                        }
                    }
                }
            }
        }
        if let Some(&b) = self.bones.iter().find(|&&b| b >= data.bones.len()) {
            return Err(out_of_range("bone", b));
        }
        let checks: [(&str, &[usize], usize); 4] = [
            ("ik constraint", &self.ik_constraints, data.ik_constraints.len()),
            (
                "transform constraint",
                &self.transform_constraints,
                data.transform_constraints.len(),
            ),
            ("path constraint", &self.path_constraints, data.path_constraints.len()),
            (
                "physics constraint",
                &self.physics_constraints,
                data.physics_constraints.len(),
            ),
        ];
        for (what, indices, len) in checks {
            if let Some(&i) = indices.iter().find(|&&i| i >= len) {
                return Err(out_of_range(what, i));
            }
        }
        Ok(())
    }
}
