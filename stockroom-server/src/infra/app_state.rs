use std::fmt;

use stockroom_core::MirrorService;

#[derive(Clone)]
pub struct AppState {
    pub mirror: MirrorService,
}

impl AppState {
    pub fn new(mirror: MirrorService) -> Self {
        Self { mirror }
    }

    pub fn mirror(&self) -> &MirrorService {
        &self.mirror
    }
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("mirror", &self.mirror)
            .finish()
    }
}
