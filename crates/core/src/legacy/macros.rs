//! Macro for declaring static typed legacy hooks
//!
//! Old call sites expect a named hook with free install/original/undo
//! functions rather than an object to thread around; this generates that
//! shape over [`crate::legacy::LegacyHook`].

/// Declares a static legacy hook with typed wrapper functions.
///
/// # Example
/// ```ignore
/// legacy_hook!(game_update, fn(i32) -> i32);
///
/// fn my_update(dt: i32) -> i32 {
///     // Pre-hook logic
///     let result = match game_update_original() {
///         Some(original) => original(dt),
///         None => dt,
///     };
///     // Post-hook logic
///     result
/// }
///
/// // At load time:
/// game_update_install(target, my_update)?;
/// ```
#[macro_export]
macro_rules! legacy_hook {
    ($name:ident, fn($($arg:ty),*) $(-> $ret:ty)?) => {
        paste::paste! {
            static [<$name:upper _HOOK>]: std::sync::LazyLock<
                parking_lot::RwLock<Option<$crate::LegacyHook>>,
            > = std::sync::LazyLock::new(|| parking_lot::RwLock::new(None));

            static [<$name:upper _ORIGINAL>]: std::sync::LazyLock<
                parking_lot::RwLock<Option<$crate::Trampoline>>,
            > = std::sync::LazyLock::new(|| parking_lot::RwLock::new(None));

            /// Install the hook at the target method.
            pub fn [<$name _install>](
                target: $crate::sdk::MethodId,
                handler: fn($($arg),*) $(-> $ret)?,
            ) -> Result<(), $crate::HookError> {
                let hook = $crate::LegacyHook::with_config(
                    target,
                    $crate::sdk::Entry(handler as usize),
                    $crate::DetourConfig {
                        id: stringify!($name).to_string(),
                        manual_apply: true,
                        ..Default::default()
                    },
                )?;
                *[<$name:upper _ORIGINAL>].write() = Some(hook.trampoline()?);
                hook.apply()?;
                *[<$name:upper _HOOK>].write() = Some(hook);
                Ok(())
            }

            /// Typed pointer for calling the rest of the chain.
            ///
            /// Returns None if the hook is not installed.
            pub fn [<$name _original>]() -> Option<fn($($arg),*) $(-> $ret)?> {
                [<$name:upper _ORIGINAL>]
                    .read()
                    .as_ref()
                    .map(|t| unsafe { std::mem::transmute(t.entry().addr()) })
            }

            /// Detach the hook, keeping it installable again later.
            pub fn [<$name _undo>]() -> Result<(), $crate::HookError> {
                if let Some(hook) = [<$name:upper _HOOK>].read().as_ref() {
                    hook.undo()
                } else {
                    Ok(())
                }
            }

            /// Reattach a previously undone hook.
            pub fn [<$name _apply>]() -> Result<(), $crate::HookError> {
                if let Some(hook) = [<$name:upper _HOOK>].read().as_ref() {
                    hook.apply()
                } else {
                    Ok(())
                }
            }

            /// Remove the hook completely.
            pub fn [<$name _remove>]() -> Result<(), $crate::HookError> {
                if let Some(hook) = [<$name:upper _HOOK>].write().take() {
                    hook.dispose()?;
                }
                *[<$name:upper _ORIGINAL>].write() = None;
                Ok(())
            }
        }
    };
}
