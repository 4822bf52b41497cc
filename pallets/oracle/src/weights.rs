use frame_support::weights::Weight;
use sp_std::marker::PhantomData;

pub trait WeightInfo {
    fn init_base() -> Weight;
    fn update() -> Weight;
    fn settle(intents: u32) -> Weight;
    fn verify() -> Weight;
}

pub struct DefaultWeightInfo<T>(PhantomData<T>);

impl<T> WeightInfo for DefaultWeightInfo<T> {
    fn init_base() -> Weight {
        Weight::from_parts(400_000, 2_048)
    }

    fn update() -> Weight {
        Weight::from_parts(600_000, 2_048)
    }

    // Two witness replays of 256 hashes per intent.
    fn settle(intents: u32) -> Weight {
        Weight::from_parts(150_000, 4_096)
            .saturating_add(Weight::from_parts(120_000, 0).saturating_mul(intents as u64))
    }

    fn verify() -> Weight {
        Weight::from_parts(2_500_000, 2_048)
    }
}

impl WeightInfo for () {
    fn init_base() -> Weight {
        DefaultWeightInfo::<()>::init_base()
    }

    fn update() -> Weight {
        DefaultWeightInfo::<()>::update()
    }

    fn settle(intents: u32) -> Weight {
        DefaultWeightInfo::<()>::settle(intents)
    }

    fn verify() -> Weight {
        DefaultWeightInfo::<()>::verify()
    }
}
