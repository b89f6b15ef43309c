use burn::{
    nn::{
        attention::{MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
        loss::CrossEntropyLossConfig,
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
};

use crate::data::batcher::EncodedBatch;

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally — do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct ClassifierConfig {
    pub vocab_size:              usize,
    pub hidden_size:             usize,
    pub num_layers:              usize,
    pub num_heads:               usize,
    pub intermediate_size:       usize,
    pub max_position_embeddings: usize,
    #[config(default = 2)]
    pub type_vocab_size:         usize,
    #[config(default = 0.1)]
    pub dropout:                 f64,
    #[config(default = 1e-12)]
    pub layer_norm_eps:          f64,
    #[config(default = 2)]
    pub num_labels:              usize,
}

impl ClassifierConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> SentimentClassifier<B> {
        SentimentClassifier {
            encoder:    self.init_encoder(device),
            dropout:    DropoutConfig::new(self.dropout).init(),
            classifier: LinearConfig::new(self.hidden_size, self.num_labels).init(device),
        }
    }

    /// The pretrained part of the network: everything except the head.
    pub fn init_encoder<B: Backend>(&self, device: &B::Device) -> BertEncoder<B> {
        let embeddings = Embeddings {
            word_embeddings:       EmbeddingConfig::new(self.vocab_size, self.hidden_size).init(device),
            position_embeddings:   EmbeddingConfig::new(self.max_position_embeddings, self.hidden_size).init(device),
            token_type_embeddings: EmbeddingConfig::new(self.type_vocab_size, self.hidden_size).init(device),
            layer_norm:            self.layer_norm(device),
            dropout:               DropoutConfig::new(self.dropout).init(),
        };
        let layers: Vec<EncoderBlock<B>> = (0..self.num_layers)
            .map(|_| self.build_encoder_block(device))
            .collect();
        let pooler = LinearConfig::new(self.hidden_size, self.hidden_size).init(device);
        BertEncoder { embeddings, layers, pooler }
    }

    fn build_encoder_block<B: Backend>(&self, device: &B::Device) -> EncoderBlock<B> {
        let self_attn   = MultiHeadAttentionConfig::new(self.hidden_size, self.num_heads)
            .with_dropout(self.dropout)
            .init(device);
        let ffn_linear1 = LinearConfig::new(self.hidden_size, self.intermediate_size).init(device);
        let ffn_linear2 = LinearConfig::new(self.intermediate_size, self.hidden_size).init(device);
        let attn_norm   = self.layer_norm(device);
        let ffn_norm    = self.layer_norm(device);
        let dropout     = DropoutConfig::new(self.dropout).init();
        EncoderBlock { self_attn, attn_norm, ffn_linear1, ffn_linear2, ffn_norm, dropout }
    }

    fn layer_norm<B: Backend>(&self, device: &B::Device) -> LayerNorm<B> {
        LayerNormConfig::new(self.hidden_size)
            .with_epsilon(self.layer_norm_eps)
            .init(device)
    }
}

#[derive(Module, Debug)]
pub struct Embeddings<B: Backend> {
    pub word_embeddings:       Embedding<B>,
    pub position_embeddings:   Embedding<B>,
    pub token_type_embeddings: Embedding<B>,
    pub layer_norm:            LayerNorm<B>,
    pub dropout:               Dropout,
}

impl<B: Backend> Embeddings<B> {
    /// input_ids: [batch, seq_len] → [batch, seq_len, hidden]
    pub fn forward(&self, input_ids: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        let [batch_size, seq_len] = input_ids.dims();
        let device = input_ids.device();

        // Self-attention is permutation-invariant, so position must be injected explicitly.
        let positions = Tensor::<B, 1, Int>::arange(0..seq_len as i64, &device)
            .unsqueeze::<2>()
            .expand([batch_size, seq_len]);
        // Single-segment input: every token belongs to segment 0.
        let token_types = Tensor::<B, 2, Int>::zeros([batch_size, seq_len], &device);

        let x = self.word_embeddings.forward(input_ids)
            + self.position_embeddings.forward(positions)
            + self.token_type_embeddings.forward(token_types);
        self.dropout.forward(self.layer_norm.forward(x))
    }
}

/// Post-norm transformer block (attention → add & norm → FFN → add & norm).
#[derive(Module, Debug)]
pub struct EncoderBlock<B: Backend> {
    pub self_attn:   MultiHeadAttention<B>,
    pub attn_norm:   LayerNorm<B>,
    pub ffn_linear1: Linear<B>,
    pub ffn_linear2: Linear<B>,
    pub ffn_norm:    LayerNorm<B>,
    pub dropout:     Dropout,
}

impl<B: Backend> EncoderBlock<B> {
    /// mask_pad: [batch, seq_len], true where the position is padding
    pub fn forward(&self, x: Tensor<B, 3>, mask_pad: Tensor<B, 2, Bool>) -> Tensor<B, 3> {
        let input = MhaInput::self_attn(x.clone()).mask_pad(mask_pad);
        let attn_output = self.self_attn.forward(input).context;
        let x = self.attn_norm.forward(x + self.dropout.forward(attn_output));
        let ffn_out = self.ffn_linear2.forward(
            burn::tensor::activation::gelu(self.ffn_linear1.forward(x.clone()))
        );
        self.ffn_norm.forward(x + self.dropout.forward(ffn_out))
    }
}

#[derive(Module, Debug)]
pub struct BertEncoder<B: Backend> {
    pub embeddings: Embeddings<B>,
    pub layers:     Vec<EncoderBlock<B>>,
    pub pooler:     Linear<B>,
}

impl<B: Backend> BertEncoder<B> {
    /// Returns the pooled first-token representation: [batch, hidden]
    pub fn forward(
        &self,
        input_ids:      Tensor<B, 2, Int>,
        attention_mask: Tensor<B, 2, Int>,
    ) -> Tensor<B, 2> {
        let mask_pad = attention_mask.equal_elem(0);

        let mut x = self.embeddings.forward(input_ids);
        for layer in &self.layers {
            x = layer.forward(x, mask_pad.clone());
        }

        let [batch_size, _, hidden] = x.dims();
        let first = x
            .slice([0..batch_size, 0..1, 0..hidden])
            .reshape([batch_size, hidden]);
        self.pooler.forward(first).tanh()
    }
}

#[derive(Module, Debug)]
pub struct SentimentClassifier<B: Backend> {
    pub encoder:    BertEncoder<B>,
    pub dropout:    Dropout,
    pub classifier: Linear<B>,
}

impl<B: Backend> SentimentClassifier<B> {
    /// input_ids, attention_mask: [batch, seq_len] → logits: [batch, num_labels]
    pub fn forward(
        &self,
        input_ids:      Tensor<B, 2, Int>,
        attention_mask: Tensor<B, 2, Int>,
    ) -> Tensor<B, 2> {
        let pooled = self.encoder.forward(input_ids, attention_mask);
        self.classifier.forward(self.dropout.forward(pooled))
    }

    /// Mean cross-entropy over the batch, plus the logits for metrics.
    pub fn forward_loss(&self, batch: EncodedBatch<B>) -> (Tensor<B, 1>, Tensor<B, 2>) {
        let logits = self.forward(batch.input_ids, batch.attention_mask);
        let ce = CrossEntropyLossConfig::new().init(&logits.device());
        let loss = ce.forward(logits.clone(), batch.labels);
        (loss, logits)
    }
}
