use serde::{Deserialize, Serialize};

use super::{BoundingBox, SceneInfo};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ObjectKind {
    Mesh,
    Camera,
    Light,
    Empty,
    Curve,
    Armature,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    pub name: String,
    pub kind: ObjectKind,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub vertex_count: usize,
    /// Corners of the object's bounds in world coordinates
    #[serde(default)]
    pub bounds: Vec<[f64; 3]>,
}

impl SceneObject {
    pub fn new<S: Into<String>>(name: S, kind: ObjectKind) -> Self {
        Self {
            name: name.into(),
            kind,
            parent: None,
            vertex_count: 0,
            bounds: Vec::new(),
        }
    }

    pub fn with_parent<S: Into<String>>(mut self, parent: S) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_mesh(mut self, vertex_count: usize, bounds: Vec<[f64; 3]>) -> Self {
        self.vertex_count = vertex_count;
        self.bounds = bounds;
        self
    }
}

/// Snapshot of the objects of a scene, in scene order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneGraph {
    pub unit_system: String,
    pub objects: Vec<SceneObject>,
}

impl SceneGraph {
    pub fn new<S: Into<String>>(unit_system: S, objects: Vec<SceneObject>) -> Self {
        Self {
            unit_system: unit_system.into(),
            objects,
        }
    }

    pub fn get(&self, name: &str) -> Option<&SceneObject> {
        self.objects.iter().find(|object| object.name == name)
    }

    pub fn has_camera(&self, name: &str) -> bool {
        self.get(name)
            .is_some_and(|object| object.kind == ObjectKind::Camera)
    }

    // Objects whose parent is not part of the snapshot are listed as roots.
    fn is_root(&self, object: &SceneObject) -> bool {
        match &object.parent {
            None => true,
            Some(parent) => self.get(parent).is_none(),
        }
    }

    fn children<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a SceneObject> + 'a {
        self.objects
            .iter()
            .filter(move |object| object.parent.as_deref() == Some(name))
    }

    /// One line per object, prefixed by one dash per level of depth
    pub fn hierarchy(&self) -> String {
        let mut out = String::new();
        for root in self.objects.iter().filter(|object| self.is_root(object)) {
            self.write_hierarchy(root, 0, &mut out);
        }
        out
    }

    fn write_hierarchy(&self, object: &SceneObject, level: usize, out: &mut String) {
        out.push_str(&"-".repeat(level + 1));
        out.push_str(&object.name);
        out.push('\n');
        for child in self.children(&object.name) {
            self.write_hierarchy(child, level + 1, out);
        }
    }

    pub fn static_info(&self) -> SceneInfo {
        let mut info = SceneInfo {
            object_count: 0,
            vertex_count: 0,
            bounding_box: None,
            cameras: Vec::new(),
            scene_units: self.unit_system.clone(),
        };

        for object in &self.objects {
            match object.kind {
                ObjectKind::Mesh => {
                    info.object_count += 1;
                    info.vertex_count += object.vertex_count;
                    for corner in &object.bounds {
                        match info.bounding_box.as_mut() {
                            Some(bounds) => bounds.include(*corner),
                            None => info.bounding_box = Some(BoundingBox::from_point(*corner)),
                        }
                    }
                }
                ObjectKind::Camera => info.cameras.push(object.name.clone()),
                _ => {}
            }
        }

        info
    }
}
