use super::bone::{RootTransform, bone_and_parent};
use crate::{
    Attachment, Bone, Color, Error, IkConstraint, PathConstraint, PhysicsConstraint,
    SkeletonData, TransformConstraint, Vertices,
};
use std::sync::Arc;

/// Determines how physics and other non-deterministic updates are applied.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Physics {
    /// Physics are not updated or applied.
    None,
    /// Physics are reset to the current pose.
    Reset,
    /// Physics are updated and the pose from physics is applied.
    Update,
    /// Physics are not updated but the pose from physics is applied.
    Pose,
}

#[derive(Clone, Debug)]
pub struct Slot {
    pub data: usize,
    pub bone: usize,
    pub color: Color,
    pub dark_color: Option<Color>,
    attachment: Option<Arc<Attachment>>,
    pub(crate) attachment_state: i32,
    /// Vertex offsets for the current vertex attachment, empty when undeformed.
    pub deform: Vec<f32>,
    /// Current sequence frame, -1 for the sequence setup index.
    pub sequence_index: i32,
}

impl Slot {
    fn new(data: &crate::SlotData) -> Self {
        Self {
            data: data.index,
            bone: data.bone,
            color: data.color,
            dark_color: data.dark_color,
            attachment: None,
            attachment_state: 0,
            deform: Vec::new(),
            sequence_index: -1,
        }
    }

    pub fn attachment(&self) -> Option<&Arc<Attachment>> {
        self.attachment.as_ref()
    }

    /// Sets the attachment and resets the sequence index. The deform buffer is kept only when
    /// both attachments share deform keys.
    pub fn set_attachment(&mut self, attachment: Option<Arc<Attachment>>) {
        let same = match (&self.attachment, &attachment) {
            (Some(old), Some(new)) => Arc::ptr_eq(old, new),
            (None, None) => true,
            _ => false,
        };
        if same {
            return;
        }
        let shares_deform = match (&self.attachment, &attachment) {
            (Some(old), Some(new)) => {
                old.timeline_id().is_some() && old.timeline_id() == new.timeline_id()
            }
            _ => false,
        };
        if !shares_deform {
            self.deform.clear();
        }
        self.attachment = attachment;
        self.sequence_index = -1;
    }

    fn set_to_setup_colors(&mut self, data: &crate::SlotData) {
        self.color = data.color;
        if let (Some(dark), Some(setup)) = (self.dark_color.as_mut(), data.dark_color) {
            *dark = setup;
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum UpdateCacheItem {
    Bone(usize),
    Ik(usize),
    Transform(usize),
    Path(usize),
    Physics(usize),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum ConstraintKind {
    Ik,
    Transform,
    Path,
    Physics,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// A posable instance of [`SkeletonData`]. Owns its bones, slots and constraint state;
/// setup data is shared.
#[derive(Clone, Debug)]
pub struct Skeleton {
    pub data: Arc<SkeletonData>,
    pub bones: Vec<Bone>,
    pub slots: Vec<Slot>,
    /// Slot indices in draw order.
    pub draw_order: Vec<usize>,
    pub ik_constraints: Vec<IkConstraint>,
    pub transform_constraints: Vec<TransformConstraint>,
    pub path_constraints: Vec<PathConstraint>,
    pub physics_constraints: Vec<PhysicsConstraint>,
    skin: Option<usize>,
    pub color: Color,
    pub x: f32,
    pub y: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    y_down: bool,
    /// Seconds of simulation time, advanced by [`Skeleton::update`] and read by physics.
    pub time: f32,
    update_cache: Vec<UpdateCacheItem>,
}

impl Skeleton {
    /// Builds a skeleton in the setup pose. `data` must have passed
    /// [`SkeletonData::validate`]; see [`Skeleton::try_new`].
    ///
    /// World coordinates are y-up unless [`Skeleton::set_y_down`] is called.
    pub fn new(data: Arc<SkeletonData>) -> Self {
        let mut bones: Vec<Bone> = data.bones.iter().map(Bone::new).collect();
        for i in 0..bones.len() {
            if let Some(parent) = bones[i].parent {
                bones[parent].children.push(i);
            }
        }
        let slots = data.slots.iter().map(Slot::new).collect();
        let ik_constraints = data
            .ik_constraints
            .iter()
            .enumerate()
            .map(|(i, c)| IkConstraint::new(i, c))
            .collect();
        let transform_constraints = data
            .transform_constraints
            .iter()
            .enumerate()
            .map(|(i, c)| TransformConstraint::new(i, c))
            .collect();
        let path_constraints = data
            .path_constraints
            .iter()
            .enumerate()
            .map(|(i, c)| PathConstraint::new(i, c))
            .collect();
        let physics_constraints = data
            .physics_constraints
            .iter()
            .enumerate()
            .map(|(i, c)| PhysicsConstraint::new(i, c))
            .collect();

        let mut skeleton = Self {
            draw_order: (0..data.slots.len()).collect(),
            data,
            bones,
            slots,
            ik_constraints,
            transform_constraints,
            path_constraints,
            physics_constraints,
            skin: None,
            color: Color::WHITE,
            x: 0.0,
            y: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            y_down: false,
            time: 0.0,
            update_cache: Vec::new(),
        };
        for i in 0..skeleton.slots.len() {
            skeleton.set_slot_to_setup_pose(i);
        }
        skeleton.update_cache();
        skeleton
    }

    pub fn try_new(data: Arc<SkeletonData>) -> Result<Self, Error> {
        data.validate()?;
        Ok(Self::new(data))
    }

    pub fn y_down(&self) -> bool {
        self.y_down
    }

    /// Selects the coordinate convention: with `y_down` the root scale Y is negated and
    /// physics gravity points the other way.
    pub fn set_y_down(&mut self, y_down: bool) {
        self.y_down = y_down;
    }

    /// The skeleton placement seen by root bones, with the y-down flip applied.
    pub fn root_transform(&self) -> RootTransform {
        RootTransform {
            x: self.x,
            y: self.y,
            scale_x: self.scale_x,
            scale_y: if self.y_down {
                -self.scale_y
            } else {
                self.scale_y
            },
        }
    }

    pub fn root_bone(&self) -> Option<&Bone> {
        self.bones.first()
    }

    pub fn skin(&self) -> Option<usize> {
        self.skin
    }

    pub fn find_bone(&self, name: &str) -> Option<usize> {
        self.data.find_bone(name)
    }

    pub fn find_slot(&self, name: &str) -> Option<usize> {
        self.data.find_slot(name)
    }

    pub fn find_ik_constraint(&self, name: &str) -> Option<usize> {
        self.data.find_ik_constraint(name)
    }

    pub fn find_transform_constraint(&self, name: &str) -> Option<usize> {
        self.data.find_transform_constraint(name)
    }

    pub fn find_path_constraint(&self, name: &str) -> Option<usize> {
        self.data.find_path_constraint(name)
    }

    pub fn find_physics_constraint(&self, name: &str) -> Option<usize> {
        self.data.find_physics_constraint(name)
    }

    /// Rebuilds the ordered list of bones and constraints to update. Must be called after
    /// the skin changes or constraints are activated.
    pub fn update_cache(&mut self) {
        self.update_cache.clear();
        let data = Arc::clone(&self.data);

        for (bone, bone_data) in self.bones.iter_mut().zip(&data.bones) {
            bone.sorted = bone_data.skin_required;
            bone.active = !bone.sorted;
        }
        if let Some(skin) = self.skin.and_then(|i| data.skins.get(i)) {
            for &skin_bone in &skin.bones {
                let mut next = Some(skin_bone);
                while let Some(i) = next {
                    let Some(bone) = self.bones.get_mut(i) else {
                        break;
                    };
                    bone.sorted = false;
                    bone.active = true;
                    next = bone.parent;
                }
            }
        }

        let mut constraints: Vec<(i32, ConstraintKind, usize)> = Vec::with_capacity(
            data.ik_constraints.len()
                + data.transform_constraints.len()
                + data.path_constraints.len()
                + data.physics_constraints.len(),
        );
        constraints.extend(
            data.ik_constraints
                .iter()
                .enumerate()
                .map(|(i, c)| (c.order, ConstraintKind::Ik, i)),
        );
        constraints.extend(
            data.transform_constraints
                .iter()
                .enumerate()
                .map(|(i, c)| (c.order, ConstraintKind::Transform, i)),
        );
        constraints.extend(
            data.path_constraints
                .iter()
                .enumerate()
                .map(|(i, c)| (c.order, ConstraintKind::Path, i)),
        );
        constraints.extend(
            data.physics_constraints
                .iter()
                .enumerate()
                .map(|(i, c)| (c.order, ConstraintKind::Physics, i)),
        );
        constraints.sort_by_key(|(order, _, _)| *order);

        for (_, kind, index) in constraints {
            match kind {
                ConstraintKind::Ik => self.sort_ik_constraint(&data, index),
                ConstraintKind::Transform => self.sort_transform_constraint(&data, index),
                ConstraintKind::Path => self.sort_path_constraint(&data, index),
                ConstraintKind::Physics => self.sort_physics_constraint(&data, index),
            }
        }

        for i in 0..self.bones.len() {
            self.sort_bone(i);
        }

        log::debug!(
            "update cache rebuilt: {} items ({} bones, {} active constraints)",
            self.update_cache.len(),
            self.bones.len(),
            self.update_cache
                .iter()
                .filter(|item| !matches!(item, UpdateCacheItem::Bone(_)))
                .count()
        );
    }

    fn skin_has(
        &self,
        data: &SkeletonData,
        pick: impl Fn(&crate::Skin) -> &[usize],
        index: usize,
    ) -> bool {
        self.skin
            .and_then(|i| data.skins.get(i))
            .is_some_and(|skin| pick(skin).contains(&index))
    }

    fn bone_active(&self, index: usize) -> bool {
        self.bones.get(index).is_some_and(|b| b.active)
    }

    fn sort_ik_constraint(&mut self, data: &SkeletonData, index: usize) {
        let constraint_data = &data.ik_constraints[index];
        let active = self.bone_active(constraint_data.target)
            && (!constraint_data.skin_required
                || self.skin_has(data, |s| &s.ik_constraints, index));
        self.ik_constraints[index].active = active;
        if !active {
            return;
        }

        self.sort_bone(constraint_data.target);
        let Some(&parent) = constraint_data.bones.first() else {
            return;
        };
        self.sort_bone(parent);
        if constraint_data.bones.len() == 1 {
            self.update_cache.push(UpdateCacheItem::Ik(index));
            self.sort_reset(parent);
        } else {
            let child = constraint_data.bones[constraint_data.bones.len() - 1];
            self.sort_bone(child);
            self.update_cache.push(UpdateCacheItem::Ik(index));
            self.sort_reset(parent);
            self.bones[child].sorted = true;
        }
    }

    fn sort_transform_constraint(&mut self, data: &SkeletonData, index: usize) {
        let constraint_data = &data.transform_constraints[index];
        let active = self.bone_active(constraint_data.target)
            && (!constraint_data.skin_required
                || self.skin_has(data, |s| &s.transform_constraints, index));
        self.transform_constraints[index].active = active;
        if !active {
            return;
        }

        self.sort_bone(constraint_data.target);
        for &bone in &constraint_data.bones {
            if constraint_data.local {
                if let Some(parent) = self.bones[bone].parent {
                    self.sort_bone(parent);
                }
            }
            self.sort_bone(bone);
        }
        self.update_cache.push(UpdateCacheItem::Transform(index));
        for &bone in &constraint_data.bones {
            self.sort_reset(bone);
        }
        for &bone in &constraint_data.bones {
            self.bones[bone].sorted = true;
        }
    }

    fn sort_path_constraint(&mut self, data: &SkeletonData, index: usize) {
        let constraint_data = &data.path_constraints[index];
        let slot_index = constraint_data.target;
        let slot_bone = self.slots[slot_index].bone;
        let active = self.bone_active(slot_bone)
            && (!constraint_data.skin_required
                || self.skin_has(data, |s| &s.path_constraints, index));
        self.path_constraints[index].active = active;
        if !active {
            return;
        }

        if let Some(skin) = self.skin {
            self.sort_path_constraint_skin(data, skin, slot_index, slot_bone);
        }
        if let Some(default_skin) = data.default_skin {
            if Some(default_skin) != self.skin {
                self.sort_path_constraint_skin(data, default_skin, slot_index, slot_bone);
            }
        }
        for skin in 0..data.skins.len() {
            self.sort_path_constraint_skin(data, skin, slot_index, slot_bone);
        }
        match self.slots[slot_index].attachment.clone() {
            Some(attachment) => self.sort_path_attachment(&attachment, slot_bone),
            None => log::debug!(
                "path constraint '{}' target slot has no path attachment",
                constraint_data.name
            ),
        }

        for &bone in &constraint_data.bones {
            self.sort_bone(bone);
        }
        self.update_cache.push(UpdateCacheItem::Path(index));
        for &bone in &constraint_data.bones {
            self.sort_reset(bone);
        }
        for &bone in &constraint_data.bones {
            self.bones[bone].sorted = true;
        }
    }

    fn sort_path_constraint_skin(
        &mut self,
        data: &SkeletonData,
        skin: usize,
        slot_index: usize,
        slot_bone: usize,
    ) {
        let Some(skin) = data.skins.get(skin) else {
            return;
        };
        for (_, attachment) in skin.attachments_for_slot(slot_index) {
            self.sort_path_attachment(attachment, slot_bone);
        }
    }

    fn sort_path_attachment(&mut self, attachment: &Attachment, slot_bone: usize) {
        let Attachment::Path(path) = attachment else {
            return;
        };
        match &path.vertex_data.vertices {
            Vertices::Unweighted(_) => self.sort_bone(slot_bone),
            Vertices::Weighted(vertices) => {
                for weight in vertices.iter().flatten() {
                    self.sort_bone(weight.bone);
                }
            }
        }
    }

    fn sort_physics_constraint(&mut self, data: &SkeletonData, index: usize) {
        let constraint_data = &data.physics_constraints[index];
        let bone = constraint_data.bone;
        let active = self.bone_active(bone)
            && (!constraint_data.skin_required
                || self.skin_has(data, |s| &s.physics_constraints, index));
        self.physics_constraints[index].active = active;
        if !active {
            return;
        }

        self.sort_bone(bone);
        self.update_cache.push(UpdateCacheItem::Physics(index));
        self.sort_reset(bone);
        self.bones[bone].sorted = true;
    }

    fn sort_bone(&mut self, index: usize) {
        let Some(bone) = self.bones.get(index) else {
            return;
        };
        if bone.sorted {
            return;
        }
        if let Some(parent) = bone.parent {
            self.sort_bone(parent);
        }
        self.bones[index].sorted = true;
        self.update_cache.push(UpdateCacheItem::Bone(index));
    }

    /// Clears `sorted` below `bone` so its descendants are updated again after a constraint
    /// moved it.
    fn sort_reset(&mut self, bone: usize) {
        for k in 0..self.bones[bone].children.len() {
            let child = self.bones[bone].children[k];
            if !self.bones[child].active {
                continue;
            }
            if self.bones[child].sorted {
                self.sort_reset(child);
            }
            self.bones[child].sorted = false;
        }
    }

    /// Computes world transforms for bones and applies constraints, in update cache order.
    pub fn update_world_transform(&mut self, physics: Physics) {
        for bone in &mut self.bones {
            bone.copy_local_to_applied();
        }
        let cache = std::mem::take(&mut self.update_cache);
        for &item in &cache {
            self.run_update_item(item, physics);
        }
        self.update_cache = cache;
    }

    /// Like [`Skeleton::update_world_transform`], but the root bone is placed under `parent`,
    /// a bone of another skeleton. The root always inherits the parent's full transform.
    pub fn update_world_transform_with_parent(&mut self, physics: Physics, parent: &Bone) {
        for bone in &mut self.bones {
            bone.copy_local_to_applied();
        }
        let root = self.root_transform();
        let (px, py) = (self.x, self.y);
        if let Some(root_bone) = self.bones.first_mut() {
            let (pa, pb, pc, pd) = (parent.a, parent.b, parent.c, parent.d);
            root_bone.world_x = pa * px + pb * py + parent.world_x;
            root_bone.world_y = pc * px + pd * py + parent.world_y;
            let rx = (root_bone.rotation + root_bone.shear_x) * crate::math::DEG_RAD;
            let ry = (root_bone.rotation + 90.0 + root_bone.shear_y) * crate::math::DEG_RAD;
            let la = rx.cos() * root_bone.scale_x;
            let lb = ry.cos() * root_bone.scale_y;
            let lc = rx.sin() * root_bone.scale_x;
            let ld = ry.sin() * root_bone.scale_y;
            root_bone.a = (pa * la + pb * lc) * root.scale_x;
            root_bone.b = (pa * lb + pb * ld) * root.scale_x;
            root_bone.c = (pc * la + pd * lc) * root.scale_y;
            root_bone.d = (pc * lb + pd * ld) * root.scale_y;
        }

        let cache = std::mem::take(&mut self.update_cache);
        for &item in &cache {
            if item != UpdateCacheItem::Bone(0) {
                self.run_update_item(item, physics);
            }
        }
        self.update_cache = cache;
    }

    fn run_update_item(&mut self, item: UpdateCacheItem, physics: Physics) {
        match item {
            UpdateCacheItem::Bone(i) => self.update_bone(i),
            UpdateCacheItem::Ik(i) => self.update_ik_constraint(i),
            UpdateCacheItem::Transform(i) => self.update_transform_constraint(i),
            UpdateCacheItem::Path(i) => self.update_path_constraint(i),
            UpdateCacheItem::Physics(i) => self.update_physics_constraint(i, physics),
        }
    }

    pub(crate) fn update_bone(&mut self, index: usize) {
        let root = self.root_transform();
        let (bone, parent) = bone_and_parent(&mut self.bones, index);
        bone.update_world_transform(parent, root);
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn update_bone_with(
        &mut self,
        index: usize,
        x: f32,
        y: f32,
        rotation: f32,
        scale_x: f32,
        scale_y: f32,
        shear_x: f32,
        shear_y: f32,
    ) {
        let root = self.root_transform();
        let (bone, parent) = bone_and_parent(&mut self.bones, index);
        bone.update_world_transform_with(
            parent, root, x, y, rotation, scale_x, scale_y, shear_x, shear_y,
        );
    }

    pub(crate) fn update_bone_applied(&mut self, index: usize) {
        let root = self.root_transform();
        let (bone, parent) = bone_and_parent(&mut self.bones, index);
        bone.update_applied_transform(parent, root);
    }

    pub fn set_to_setup_pose(&mut self) {
        self.set_bones_to_setup_pose();
        self.set_slots_to_setup_pose();
    }

    /// Resets bones and constraints to the setup pose.
    pub fn set_bones_to_setup_pose(&mut self) {
        let data = Arc::clone(&self.data);
        for (bone, bone_data) in self.bones.iter_mut().zip(&data.bones) {
            bone.set_to_setup_pose(bone_data);
        }
        for c in &mut self.ik_constraints {
            c.set_to_setup_pose(&data.ik_constraints[c.data]);
        }
        for c in &mut self.transform_constraints {
            c.set_to_setup_pose(&data.transform_constraints[c.data]);
        }
        for c in &mut self.path_constraints {
            c.set_to_setup_pose(&data.path_constraints[c.data]);
        }
        for c in &mut self.physics_constraints {
            c.set_to_setup_pose(&data.physics_constraints[c.data]);
        }
    }

    /// Resets slot colors, attachments and the draw order to the setup pose.
    pub fn set_slots_to_setup_pose(&mut self) {
        self.draw_order.clear();
        self.draw_order.extend(0..self.slots.len());
        for i in 0..self.slots.len() {
            self.set_slot_to_setup_pose(i);
        }
    }

    pub(crate) fn set_slot_to_setup_pose(&mut self, index: usize) {
        let data = Arc::clone(&self.data);
        let Some(slot_data) = data.slots.get(index) else {
            return;
        };
        let attachment = slot_data
            .attachment_name
            .as_deref()
            .and_then(|name| self.attachment(index, name))
            .cloned();
        let slot = &mut self.slots[index];
        slot.set_to_setup_colors(slot_data);
        slot.set_attachment(None);
        slot.set_attachment(attachment);
    }

    /// Looks up an attachment in the current skin, then the default skin.
    pub fn attachment(&self, slot_index: usize, name: &str) -> Option<&Arc<Attachment>> {
        self.skin
            .and_then(|i| self.data.skins.get(i))
            .and_then(|skin| skin.attachment(slot_index, name))
            .or_else(|| {
                self.data
                    .default_skin
                    .and_then(|i| self.data.skins.get(i))
                    .and_then(|skin| skin.attachment(slot_index, name))
            })
    }

    /// Sets a slot's attachment by name, or clears it when `attachment_name` is `None`.
    pub fn set_attachment(
        &mut self,
        slot_name: &str,
        attachment_name: Option<&str>,
    ) -> Result<(), Error> {
        let slot_index = self.find_slot(slot_name).ok_or_else(|| Error::UnknownSlot {
            name: slot_name.to_string(),
        })?;
        let attachment = match attachment_name {
            Some(name) => Some(
                self.attachment(slot_index, name)
                    .cloned()
                    .ok_or_else(|| Error::UnknownAttachment {
                        slot: slot_name.to_string(),
                        name: name.to_string(),
                    })?,
            ),
            None => None,
        };
        self.slots[slot_index].set_attachment(attachment);
        Ok(())
    }

    /// Switches skins. Coming from no skin, setup attachments present in the new skin are
    /// attached; otherwise attachments of the old skin are swapped for the new skin's
    /// attachments of the same name.
    pub fn set_skin(&mut self, skin: Option<usize>) {
        if skin == self.skin {
            return;
        }
        let data = Arc::clone(&self.data);
        if let Some(new_skin) = skin.and_then(|i| data.skins.get(i)) {
            match self.skin.and_then(|i| data.skins.get(i)) {
                Some(old_skin) => new_skin.attach_all(self, old_skin),
                None => {
                    for (i, slot_data) in data.slots.iter().enumerate() {
                        let Some(name) = slot_data.attachment_name.as_deref() else {
                            continue;
                        };
                        if let Some(attachment) = new_skin.attachment(i, name) {
                            self.slots[i].set_attachment(Some(Arc::clone(attachment)));
                        }
                    }
                }
            }
            log::debug!("skin set to '{}'", new_skin.name);
        } else if let Some(index) = skin {
            log::warn!("skin index {index} is out of range, no attachments changed");
        }
        self.skin = skin;
        self.update_cache();
    }

    pub fn set_skin_by_name(&mut self, name: &str) -> Result<(), Error> {
        let skin = self.data.find_skin(name).ok_or_else(|| Error::UnknownSkin {
            name: name.to_string(),
        })?;
        self.set_skin(Some(skin));
        Ok(())
    }

    /// Advances the time used by physics.
    pub fn update(&mut self, delta: f32) {
        self.time += delta;
    }

    /// Applies the next physics update as if the bones had moved an extra (`x`, `y`) in world
    /// space. Passing the negated distance of a teleport keeps it from exciting the springs.
    pub fn physics_translate(&mut self, x: f32, y: f32) {
        for constraint in &mut self.physics_constraints {
            constraint.translate(x, y);
        }
    }

    /// Rotates physics state about (`x`, `y`) in world space.
    pub fn physics_rotate(&mut self, x: f32, y: f32, degrees: f32) {
        for constraint in &mut self.physics_constraints {
            constraint.rotate(x, y, degrees);
        }
    }

    /// Axis-aligned bounds of the region and mesh attachments of active slots, or `None`
    /// when nothing is visible. `scratch` is reused for world vertices.
    pub fn bounds(&self, scratch: &mut Vec<f32>) -> Option<Bounds> {
        let (mut min_x, mut min_y) = (f32::INFINITY, f32::INFINITY);
        let (mut max_x, mut max_y) = (f32::NEG_INFINITY, f32::NEG_INFINITY);
        for &slot_index in &self.draw_order {
            let slot = &self.slots[slot_index];
            let Some(bone) = self.bones.get(slot.bone) else {
                continue;
            };
            if !bone.active {
                continue;
            }
            let count = match slot.attachment.as_deref() {
                Some(Attachment::Region(region)) => {
                    scratch.resize(8, 0.0);
                    region.compute_world_vertices(bone, scratch, 0, 2);
                    8
                }
                Some(Attachment::Mesh(mesh)) => {
                    let count = mesh.vertex_data.world_vertices_length();
                    scratch.resize(count, 0.0);
                    mesh.vertex_data
                        .compute_world_vertices(self, slot, 0, count, scratch, 0, 2);
                    count
                }
                _ => continue,
            };
            for p in scratch[..count].chunks_exact(2) {
                min_x = min_x.min(p[0]);
                min_y = min_y.min(p[1]);
                max_x = max_x.max(p[0]);
                max_y = max_y.max(p[1]);
            }
        }
        (min_x <= max_x).then(|| Bounds {
            x: min_x,
            y: min_y,
            width: max_x - min_x,
            height: max_y - min_y,
        })
    }
}
