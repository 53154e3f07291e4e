use crate::domain::entities::EntityChange;

pub trait ChangeNotifier: Send + Sync {
    fn publish(&self, change: EntityChange);
}
