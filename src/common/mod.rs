macro_rules! id {
    ($t:ty) => {
        ::std::any::TypeId::of::<$t>()
    };
}

mod once_cell;
mod type_map;

pub(crate) use self::once_cell::Lazy;
pub(crate) use self::type_map::TypeMap;
