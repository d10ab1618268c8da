// src/resources/material/macros.rs

/// API generator for material families.
///
/// Generates setters, getters and texture-slot accessors over the hidden
/// fields, exposing a clean public API. Every setter compares before
/// writing: assigning the current value is a no-op and does not bump the
/// material version, which is what keeps the executor's uniform-diff cache
/// warm across frames.
#[macro_export]
macro_rules! impl_material_api {
    (
        $struct_name:ident,
        // Uniforms: (field name, type, doc)
        uniforms: [ $(($u_field:ident, $u_type:ty, $u_doc:expr)),* $(,)? ],
        // Textures: (field name, doc)
        textures: [ $(($t_field:ident, $t_doc:expr)),* $(,)? ]
    ) => {
        impl $struct_name {

            // ==========================================
            // 1. Shared settings API
            // ==========================================

            /// Enables or disables alpha blending for this material.
            /// Transparent materials render in the back-to-front bucket.
            pub fn set_transparent(&mut self, transparent: bool) {
                if self.settings.transparent != transparent {
                    self.settings.transparent = transparent;
                    self.version.changed();
                }
            }
            #[must_use]
            pub fn transparent(&self) -> bool {
                self.settings.transparent
            }

            /// Sets the blending mode.
            pub fn set_blending(&mut self, blending: $crate::resources::material::Blending) {
                if self.settings.blending != blending {
                    self.settings.blending = blending;
                    self.version.changed();
                }
            }
            #[must_use]
            pub fn blending(&self) -> $crate::resources::material::Blending {
                self.settings.blending
            }

            /// Sets which faces render (Front/Back/Double).
            pub fn set_side(&mut self, side: $crate::resources::material::Side) {
                if self.settings.side != side {
                    self.settings.side = side;
                    self.version.changed();
                }
            }
            #[must_use]
            pub fn side(&self) -> $crate::resources::material::Side {
                self.settings.side
            }

            /// Enables or disables depth testing.
            pub fn set_depth_test(&mut self, depth_test: bool) {
                if self.settings.depth_test != depth_test {
                    self.settings.depth_test = depth_test;
                    self.version.changed();
                }
            }
            #[must_use]
            pub fn depth_test(&self) -> bool {
                self.settings.depth_test
            }

            /// Enables or disables depth writes.
            /// Usually disabled for transparent materials.
            pub fn set_depth_write(&mut self, depth_write: bool) {
                if self.settings.depth_write != depth_write {
                    self.settings.depth_write = depth_write;
                    self.version.changed();
                }
            }
            #[must_use]
            pub fn depth_write(&self) -> bool {
                self.settings.depth_write
            }

            /// Sets the alpha-test threshold (`None` disables alpha testing).
            /// Toggling presence re-specializes the program on next use.
            pub fn set_alpha_test(&mut self, alpha_test: Option<f32>) {
                if self.settings.alpha_test != alpha_test {
                    self.settings.alpha_test = alpha_test;
                    self.version.changed();
                }
            }
            #[must_use]
            pub fn alpha_test(&self) -> Option<f32> {
                self.settings.alpha_test
            }

            // --- Uniform accessors ---
            $(
                paste::paste! {
                    #[doc = $u_doc]
                    pub fn [<set_ $u_field>](&mut self, value: $u_type) {
                        if self.$u_field != value {
                            self.$u_field = value;
                            self.version.changed();
                        }
                    }
                }

                #[must_use]
                pub fn $u_field(&self) -> $u_type {
                    self.$u_field
                }
            )*

            // --- Texture slots ---
            $(
                paste::paste! {
                    #[doc = $t_doc]
                    pub fn [<set_ $t_field>](
                        &mut self,
                        texture: Option<$crate::resources::pool::TextureHandle>,
                    ) {
                        if self.$t_field != texture {
                            self.$t_field = texture;
                            self.version.changed();
                        }
                    }
                }

                #[must_use]
                pub fn $t_field(&self) -> Option<$crate::resources::pool::TextureHandle> {
                    self.$t_field
                }
            )*

            /// Pushes every bound texture slot as a `(sampler name, handle)`
            /// pair, in declaration order (which fixes unit assignment).
            pub fn texture_bindings(
                &self,
                out: &mut smallvec::SmallVec<
                    [(&'static str, $crate::resources::pool::TextureHandle); 8],
                >,
            ) {
                $(
                    if let Some(handle) = self.$t_field {
                        out.push((stringify!($t_field), handle));
                    }
                )*
            }

            /// Material version; bumps on any effective property change.
            #[must_use]
            pub fn version(&self) -> u64 {
                self.version.version()
            }

            #[must_use]
            pub fn settings(&self) -> &$crate::resources::material::MaterialSettings {
                &self.settings
            }
        }
    };
}
