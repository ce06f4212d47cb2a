#[macro_export]
macro_rules! WM_NAME (
    () => { "lintel" };
);

#[macro_export]
macro_rules! build_key_bindings(
    { @start $key_bindings:expr, $keycodes:expr,
        $( $binding:expr ),+ => $command:expr,
        $($tail:tt)*
    } => {
        $(
            match $crate::util::Util::parse_key_binding($binding, &$keycodes) {
                None => panic!("could not parse key binding: {}", $binding),
                Some(key_code) => $key_bindings.insert(key_code, $command),
            };
        )+
        build_key_bindings!(@start $key_bindings, $keycodes, $($tail)*);
    };

    { @start $key_bindings:expr, $keycodes:expr,
        $($tail:tt)*
    } => {
        $(compile_error!(
            stringify!(incorrect syntax in build_key_bindings: $tail)
        );)*
    };

    { $($tokens:tt)+ } => {
        {
            let mut key_bindings = $crate::binding::KeyBindings::new();
            let keycodes = $crate::util::Util::system_keycodes();
            build_key_bindings!(@start key_bindings, keycodes, $($tokens)+);
            key_bindings
        }
    };
);
